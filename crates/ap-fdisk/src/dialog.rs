//! Questions and notices towards the user.

/// The severity of a notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
}

/// A question for a number in `low..=high`.
#[derive(Clone, Debug)]
pub struct NumberQuery {
    pub query: String,
    pub low: u64,
    pub default: u64,
    pub high: u64,
    /// Relative answers count from here.
    pub base: u64,
    /// The size of one unit in bytes.
    pub unit: u64,
}

/// The answer to a [`NumberQuery`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NumberReply {
    /// Either the number itself or, if relative, the distance from the base.
    pub value: u64,
    pub relative: bool,
}

impl NumberReply {
    pub fn absolute(value: u64) -> Self {
        Self { value, relative: false }
    }

    pub fn relative(value: u64) -> Self {
        Self { value, relative: true }
    }
}

/// The capability to talk to the user.
///
/// Returning `None` from a question cancels the running operation.
pub trait Dialog {
    fn ask_number(&self, query: &NumberQuery) -> Option<NumberReply>;

    /// Pick one of the keys in `items`.
    fn ask_menu(&self, query: &str, items: &[(char, &str)], default: char) -> Option<char>;

    fn ask_string(&self, query: &str) -> Option<String>;

    fn message(&self, level: Level, msg: &str);
}
