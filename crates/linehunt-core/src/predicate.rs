/// Per-line test applied by workers
pub trait Predicate: Send + Sync {
    fn matches(&self, line: &str) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, line: &str) -> bool {
        self(line)
    }
}

/// Literal substring match, optionally ignoring case (like `grep -F`, `grep -Fi`)
#[derive(Debug, Clone)]
pub struct Substring {
    term: String,
    ignore_case: bool,
}

impl Substring {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ignore_case: false,
        }
    }

    pub fn ignore_case(term: impl Into<String>) -> Self {
        Self {
            term: term.into().to_lowercase(),
            ignore_case: true,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }
}

impl Predicate for Substring {
    fn matches(&self, line: &str) -> bool {
        if self.ignore_case {
            line.to_lowercase().contains(&self.term)
        } else {
            line.contains(&self.term)
        }
    }
}
