use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SetupError {
    #[error("question count must be at least 1")]
    ZeroCount,
}

/// Which part of the bank a practice run draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PracticeMode {
    #[default]
    All,
    /// Only questions whose latest attempt was incorrect.
    MissedOnly,
}

/// Category restriction for a practice run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    /// Sentinel used by setup forms for "every category".
    pub const ALL: &'static str = "ALL";

    /// Maps the `"ALL"` sentinel (and blank input) to `CategoryFilter::All`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() || raw == Self::ALL {
            Self::All
        } else {
            Self::Only(raw.to_owned())
        }
    }

    /// Exact match unless unrestricted.
    #[must_use]
    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }
}

/// Criteria chosen on the setup screen. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSetup {
    mode: PracticeMode,
    category: CategoryFilter,
    keyword: String,
    sata_only: bool,
    count: u32,
}

impl Default for SessionSetup {
    fn default() -> Self {
        Self {
            mode: PracticeMode::All,
            category: CategoryFilter::All,
            keyword: String::new(),
            sata_only: false,
            count: Self::DEFAULT_COUNT,
        }
    }
}

impl SessionSetup {
    pub const DEFAULT_COUNT: u32 = 10;

    #[must_use]
    pub fn with_mode(mut self, mode: PracticeMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

    #[must_use]
    pub fn with_sata_only(mut self, sata_only: bool) -> Self {
        self.sata_only = sata_only;
        self
    }

    /// Set the requested number of questions.
    ///
    /// # Errors
    ///
    /// Returns `SetupError::ZeroCount` for `0`.
    pub fn with_count(mut self, count: u32) -> Result<Self, SetupError> {
        if count == 0 {
            return Err(SetupError::ZeroCount);
        }
        self.count = count;
        Ok(self)
    }

    #[must_use]
    pub fn mode(&self) -> PracticeMode {
        self.mode
    }

    #[must_use]
    pub fn category(&self) -> &CategoryFilter {
        &self.category
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    #[must_use]
    pub fn sata_only(&self) -> bool {
        self.sata_only
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }
}
