/// External token category (`itc_eep`) groupings used throughout the risk
/// engine. Ported verbatim from the original `token_map` in
/// `basel_framework/utils.py`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Cash,
    Equity,
    Index,
    Commodity,
    Fx,
    Settlement,
    Derivative,
}

impl Category {
    pub fn itc_eep_codes(self) -> &'static [&'static str] {
        match self {
            Category::Cash => &["EEP21PP01USD"],
            Category::Equity => &["EEP22G", "EEP22NT02", "EEP22TU03", "EEP23E", "EEP23EQ"],
            Category::Index => &["EEP23FD"],
            Category::Commodity => &["EEP23A", "EEP23ER"],
            Category::Fx => &["EEP21PP01CHF", "EEP21PP01EUR"],
            Category::Settlement => &["EEP22S", "EEP22TU01", "EEP22TU02"],
            Category::Derivative => &["EEP23DV", "EEP23DV03"],
        }
    }

    pub const ALL: [Category; 7] = [
        Category::Cash,
        Category::Equity,
        Category::Index,
        Category::Commodity,
        Category::Fx,
        Category::Settlement,
        Category::Derivative,
    ];

    /// Resolve the category of an `itc_eep` code, if any.
    pub fn from_itc_eep(itc_eep: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|category| category.itc_eep_codes().contains(&itc_eep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_codes() {
        assert_eq!(Category::from_itc_eep("EEP21PP01USD"), Some(Category::Cash));
        assert_eq!(Category::from_itc_eep("EEP23DV03"), Some(Category::Derivative));
    }

    #[test]
    fn unknown_code_has_no_category() {
        assert_eq!(Category::from_itc_eep("unknown"), None);
    }
}
