//! Main-ingredient extraction from free product text.

/// Ordered keyword vocabulary. The first keyword found in the product text wins,
/// so more specific spices sit ahead of generic words like `masala` or `powder`.
pub const INGREDIENT_KEYWORDS: &[&str] = &[
    "rice",
    "wheat",
    "flour",
    "dal",
    "lentil",
    "chickpea",
    "moong",
    "toor",
    "chana",
    "spice",
    "turmeric",
    "cumin",
    "coriander",
    "chili",
    "pepper",
    "garam masala",
    "clove",
    "cinnamon",
    "oil",
    "ghee",
    "butter",
    "coconut",
    "olive",
    "jaggery",
    "sugar",
    "honey",
    "molasses",
    "pickle",
    "chutney",
    "sauce",
    "paste",
    "snack",
    "chip",
    "namkeen",
    "mixture",
    "sweet",
    "cake",
    "cookie",
    "biscuit",
    "candy",
    "tea",
    "coffee",
    "beverage",
    "nut",
    "almond",
    "cashew",
    "walnut",
    "pistachio",
    "dried fruit",
    "raisin",
    "date",
    "fig",
    "masala",
    "seasoning",
    "spice blend",
    "powder",
];

pub const FALLBACK_INGREDIENT: &str = "mixed";

pub fn extract_main_ingredient(name: &str, description: &str) -> String {
    let text = format!("{name} {description}").to_lowercase();

    if let Some(keyword) = INGREDIENT_KEYWORDS.iter().find(|keyword| text.contains(*keyword)) {
        return (*keyword).to_string();
    }

    name.split_whitespace()
        .next()
        .map(str::to_lowercase)
        .unwrap_or_else(|| FALLBACK_INGREDIENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::extract_main_ingredient;

    #[test]
    fn first_keyword_in_vocabulary_order_wins() {
        // `spice` precedes `turmeric` in the vocabulary even though it appears later in the text.
        assert_eq!(extract_main_ingredient("Turmeric Powder", "pure spice"), "spice");
        assert_eq!(extract_main_ingredient("Basmati Rice", ""), "rice");
    }

    #[test]
    fn matching_is_case_insensitive_over_name_and_description() {
        assert_eq!(extract_main_ingredient("Morning Blend", "Strong ASSAM TEA leaves"), "tea");
    }

    #[test]
    fn falls_back_to_first_word_then_mixed() {
        assert_eq!(extract_main_ingredient("Kokum Sherbet", "tangy"), "kokum");
        assert_eq!(extract_main_ingredient("", ""), "mixed");
    }
}
