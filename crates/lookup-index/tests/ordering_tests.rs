use lookup_index::{CategoryOrder, IndexItem, IndexStore, LocalMatcher};
use proptest::prelude::*;

const STATUTE_PRIORITY: [&str; 6] = [
    "Crimes Against Persons",
    "Property Crimes",
    "Drug Offenses",
    "Weapons Offenses",
    "Traffic Offenses",
    "Public Order & Obstruction",
];

fn category_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Crimes Against Persons".to_string()),
        Just("Property Crimes".to_string()),
        Just("Drug Offenses".to_string()),
        Just("Defenses".to_string()),
        Just("AI Result".to_string()),
        "[A-Z][a-z]{1,8}",
    ]
}

#[test]
fn burglary_query_hits_both_burglary_items() {
    let store = IndexStore::new(vec![
        IndexItem::new("s810-02-d", "Property Crimes").with_field("title", "Burglary of a Dwelling"),
        IndexItem::new("s810-02-s", "Property Crimes").with_field("title", "Burglary of a Structure"),
        IndexItem::new("s812-014", "Property Crimes").with_field("title", "Theft"),
    ])
    .unwrap();

    let hits = LocalMatcher::default().matches("burglary", store.items());
    assert_eq!(hits.len(), 2);
}

#[test]
fn store_categories_follow_priority_then_alphabet() {
    let store = IndexStore::new(vec![
        IndexItem::new("a", "Zoning"),
        IndexItem::new("b", "Property Crimes"),
        IndexItem::new("c", "Animal Control"),
        IndexItem::new("d", "Crimes Against Persons"),
    ])
    .unwrap()
    .with_category_order(CategoryOrder::new(STATUTE_PRIORITY));

    assert_eq!(
        store.categories(),
        vec!["Crimes Against Persons", "Property Crimes", "Animal Control", "Zoning"]
    );
}

proptest! {
    #[test]
    fn prop_grouping_is_deterministic_and_total(
        categories in prop::collection::vec(category_strategy(), 0..40)
    ) {
        let items: Vec<IndexItem> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| IndexItem::new(format!("item-{i}"), c.clone()))
            .collect();
        let order = CategoryOrder::new(STATUTE_PRIORITY);

        let first = order.group(&items);
        let second = order.group(&items);
        prop_assert_eq!(&first, &second);

        // every item lands in exactly one group
        let grouped: usize = first.iter().map(|g| g.items.len()).sum();
        prop_assert_eq!(grouped, items.len());

        // known categories precede unknown ones, unknown ones are sorted
        let names: Vec<&str> = first.iter().map(|g| g.category).collect();
        let split = names.iter().position(|n| order.position(n).is_none()).unwrap_or(names.len());
        prop_assert!(names[split..].iter().all(|n| order.position(n).is_none()));
        prop_assert!(names[split..].windows(2).all(|w| w[0] < w[1]));
        prop_assert!(names[..split]
            .windows(2)
            .all(|w| order.position(w[0]) < order.position(w[1])));
    }

    #[test]
    fn prop_empty_query_is_no_filter(titles in prop::collection::vec("[a-z ]{0,12}", 0..20)) {
        let items: Vec<IndexItem> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| IndexItem::new(format!("id-{i}"), "Any").with_field("title", t.clone()))
            .collect();
        prop_assert_eq!(LocalMatcher::default().matches("", &items).len(), items.len());
    }

    #[test]
    fn prop_match_ignores_case(title in "[a-zA-Z]{1,12}", start in 0usize..12, len in 1usize..6) {
        let item = IndexItem::new("x", "Any").with_field("title", title.clone());
        let items = vec![item];
        let start = start.min(title.len() - 1);
        let end = (start + len).min(title.len());
        let needle = title[start..end].to_uppercase();
        prop_assert_eq!(LocalMatcher::default().count(&needle, &items), 1);
    }
}
