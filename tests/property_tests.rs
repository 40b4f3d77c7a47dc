use proptest::prelude::*;
use storefront_api::queries::listing::{Pagination, Projection, DEFAULT_LIMIT};
use storefront_api::services::product_catalog::{join_option_values, slugify, split_option_values};

proptest! {
    #[test]
    fn skip_and_take_follow_page_and_limit(limit in 1u64..500, page in 1u64..1000) {
        let pagination = Pagination::parse(Some(&limit.to_string()), Some(&page.to_string())).unwrap();
        prop_assert_eq!(pagination.take, Some(limit));
        prop_assert_eq!(pagination.skip(), Some((page - 1) * limit));
    }

    #[test]
    fn total_pages_covers_every_record(limit in 1u64..200, total in 0u64..10_000) {
        let pagination = Pagination::parse(Some(&limit.to_string()), None).unwrap();
        let pages = pagination.total_pages(total);
        prop_assert!(pages * limit >= total);
        prop_assert!(pages == 0 || (pages - 1) * limit < total);
    }

    #[test]
    fn unlimited_is_always_one_page(page in 1u64..50, total in 0u64..10_000) {
        let pagination = Pagination::parse(Some("-1"), Some(&page.to_string())).unwrap();
        prop_assert_eq!(pagination.take, None);
        prop_assert_eq!(pagination.skip(), None);
        prop_assert_eq!(pagination.total_pages(total), 1);
    }

    #[test]
    fn non_numeric_limit_is_rejected(raw in "[a-zA-Z]{1,8}") {
        prop_assert!(Pagination::parse(Some(&raw), None).is_err());
    }

    #[test]
    fn option_values_without_commas_round_trip(values in prop::collection::vec("[^,]{1,12}", 1..8)) {
        let stored = join_option_values(&values);
        prop_assert_eq!(split_option_values(&stored), values);
    }

    #[test]
    fn slugs_are_url_safe(name in "[ -~]{0,40}") {
        let slug = slugify(&name);
        prop_assert!(!slug.starts_with('-'));
        prop_assert!(!slug.ends_with('-'));
        prop_assert!(!slug.contains("--"));
        prop_assert!(slug.chars().all(|c| c == '-' || c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn projection_keeps_only_selected_and_always_keys(
        fields in prop::collection::vec("[a-z_]{1,10}", 1..5)
    ) {
        let projection = Projection::parse(Some(&fields.join(",")), Projection::All);
        let record = serde_json::json!({"id": 1, "name": "x", "images": []});
        let projected = projection.apply(record, &["images"]);
        let object = projected.as_object().unwrap();
        prop_assert!(object.contains_key("images"));
        for key in object.keys() {
            prop_assert!(key == "images" || fields.contains(key));
        }
    }
}

#[test]
fn defaults_apply_when_parameters_are_absent() {
    let pagination = Pagination::parse(None, None).unwrap();
    assert_eq!(pagination.take, Some(DEFAULT_LIMIT));
    assert_eq!(pagination.skip(), Some(0));
}
