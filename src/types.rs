use parse_display::{Display, FromStr};

/// How a command renders its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromStr, Display)]
#[display(style = "kebab-case")]
pub enum FormatOutput {
    Json,
    Yaml,
    Table,
}

impl Default for FormatOutput {
    fn default() -> FormatOutput {
        FormatOutput::Table
    }
}

impl FormatOutput {
    /// The accepted spellings, for `possible_values` on output flags.
    pub const VARIANTS: &'static [&'static str] = &["json", "yaml", "table"];
}
