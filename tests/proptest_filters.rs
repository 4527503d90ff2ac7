//! Property-based tests using proptest
//!
//! These tests check the filter engine's exact-match semantics and the
//! create-body assembly using randomized inputs.

use cloudlayer::resource::codec::create_attributes;
use cloudlayer::resource::get_resource;
use cloudlayer::{CreateRequest, Filter, Resource};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Generate arbitrary network data for testing
fn arb_network() -> impl Strategy<Value = Resource> {
    (
        "[a-f0-9]{8}",          // id
        "(test|net[0-9]|prod)", // name, with deliberate duplicates
        prop_oneof!["ACTIVE", "DOWN", "BUILD", "ERROR"],
        any::<bool>(),
    )
        .prop_map(|(id, name, status, shared)| {
            Resource::from_value(json!({
                "id": id,
                "name": name,
                "status": status,
                "shared": shared
            }))
            .expect("object")
        })
}

/// Generate a list of networks
fn arb_network_list() -> impl Strategy<Value = Vec<Resource>> {
    prop::collection::vec(arb_network(), 0..50)
}

/// Generate a filter over the generated attributes
fn arb_filter() -> impl Strategy<Value = Filter> {
    (
        prop::option::of("(test|net[0-9]|prod)"),
        prop::option::of(prop_oneof!["ACTIVE", "DOWN"]),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(name, status, shared)| {
            let mut filter = Filter::new();
            if let Some(name) = name {
                filter.insert("name", name);
            }
            if let Some(status) = status {
                filter.insert("status", status);
            }
            if let Some(shared) = shared {
                filter.insert("shared", shared);
            }
            filter
        })
}

proptest! {
    /// Empty filter returns all items
    #[test]
    fn empty_filter_returns_all(items in arb_network_list()) {
        let filtered = Filter::new().apply(items.clone());
        prop_assert_eq!(filtered, items);
    }

    /// Filtering is idempotent
    #[test]
    fn filter_is_idempotent(items in arb_network_list(), filter in arb_filter()) {
        let once = filter.apply(items);
        let twice = filter.apply(once.clone());
        prop_assert_eq!(once, twice);
    }

    /// Filtering returns exactly the matching items, in order
    #[test]
    fn filter_keeps_exact_matches_in_order(items in arb_network_list(), filter in arb_filter()) {
        let expected: Vec<Resource> = items
            .iter()
            .filter(|item| {
                filter.iter().all(|(key, value)| item.get(key) == Some(value))
            })
            .cloned()
            .collect();

        prop_assert_eq!(filter.apply(items), expected);
    }

    /// Filtering by name never returns another name
    #[test]
    fn name_filter_is_exact(items in arb_network_list(), name in "(test|net[0-9]|prod)") {
        let filtered = Filter::new().with("name", name.as_str()).apply(items);
        for item in &filtered {
            prop_assert_eq!(item.name(), Some(name.as_str()));
        }
    }

    /// Provider options outside the allow-list never reach the wire
    #[test]
    fn provider_allow_list_is_enforced(
        extra_keys in prop::collection::btree_set("[a-z_]{1,12}", 0..6),
        network_type in "(vlan|vxlan|flat)",
    ) {
        let networks = get_resource("networks").unwrap();
        let mut provider = serde_json::Map::new();
        provider.insert("network_type".into(), Value::from(network_type.clone()));
        for key in &extra_keys {
            provider.entry(key.clone()).or_insert(Value::from(1));
        }

        let request = CreateRequest::new("netname").provider(Value::Object(provider));
        let attrs = create_attributes(networks, &request).unwrap();

        for key in attrs.keys() {
            prop_assert!(
                ["name", "admin_state_up"].contains(&key.as_str())
                    || networks
                        .provider
                        .keys
                        .iter()
                        .any(|k| *key == format!("provider:{}", k)),
                "unexpected wire attribute {}",
                key
            );
        }
        prop_assert!(attrs.contains_key("provider:network_type"));
    }

    /// Anything but a mapping is rejected as provider options
    #[test]
    fn non_mapping_provider_is_rejected(value in prop_oneof![
        any::<i64>().prop_map(Value::from),
        ".*".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        prop::collection::vec(any::<u8>(), 0..4).prop_map(|v| json!(v)),
    ]) {
        let networks = get_resource("networks").unwrap();
        let err = create_attributes(networks, &CreateRequest::new("n").provider(value)).unwrap_err();
        prop_assert_eq!(err.message(), "Parameter 'provider' must be a dict");
    }
}
