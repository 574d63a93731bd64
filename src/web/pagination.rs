use serde::{Deserialize, Serialize};

fn default_index() -> u64 {
    1
}

fn default_size() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Pagination {
    #[serde(default = "default_index")]
    pub index: u64,
    #[serde(default = "default_size")]
    pub size: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { index: 1, size: 10 }
    }
}

impl Pagination {
    pub fn offset(&self) -> u64 {
        (self.index - 1) * self.size
    }

    pub fn limit(&self) -> u64 {
        self.size
    }

    pub fn check(&self) -> Self {
        if self.index < 1 || self.size < 1 {
            return Self::default();
        }
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_zero_based() {
        let page = Pagination { index: 3, size: 20 };
        assert_eq!(page.offset(), 40);
        assert_eq!(page.limit(), 20);
    }

    #[test]
    fn check_falls_back_to_defaults() {
        let page = Pagination { index: 0, size: 10 };
        assert_eq!(page.check().index, 1);
    }
}
