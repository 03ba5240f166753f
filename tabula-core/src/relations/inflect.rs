//! English inflection used for navigation property names and FK matching

use heck::ToUpperCamelCase;

/// `category` → `categories`, `box` → `boxes`, `order` → `orders`
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        return format!("{}ies", stem);
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| word.ends_with(suffix)) {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

/// `categories` → `category`, `boxes` → `box`, `orders` → `order`, `class` → `class`
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    if word.ends_with("es") && !word.ends_with("ses") {
        return word[..word.len() - 2].to_string();
    }
    if word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// `order_items` → `OrderItem`
pub fn singular_pascal(table: &str) -> String {
    singularize(table).to_upper_camel_case()
}

/// `order_items` → `OrderItems`, `customer` → `Customers`
pub fn plural_pascal(table: &str) -> String {
    pluralize(&singularize(table)).to_upper_camel_case()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("match"), "matches");
        assert_eq!(pluralize("wish"), "wishes");
        assert_eq!(pluralize("bus"), "buses");
        assert_eq!(pluralize("order"), "orders");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("customers"), "customer");
        assert_eq!(singularize("class"), "class");
        assert_eq!(singularize("order"), "order");
    }

    #[test]
    fn test_navigation_names() {
        assert_eq!(singular_pascal("customers"), "Customer");
        assert_eq!(plural_pascal("customers"), "Customers");
        assert_eq!(plural_pascal("order_items"), "OrderItems");
        assert_eq!(singular_pascal("order_items"), "OrderItem");
        assert_eq!(plural_pascal("category"), "Categories");
    }
}
