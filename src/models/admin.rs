use std::collections::HashSet;

/// Telegram ids allowed into admin-only routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminIds(HashSet<String>);

impl AdminIds {
    /// Parses a comma separated list such as `"111, 222,,333"`.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn contains(&self, telegram_id: &str) -> bool {
        self.0.contains(telegram_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
