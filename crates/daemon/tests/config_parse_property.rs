use std::collections::BTreeMap;

use autocommit_daemon::config::{AutoCommitConfig, ConfigError, ConfigMap};
use proptest::prelude::*;

fn key() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,11}"
}

fn value() -> impl Strategy<Value = String> {
    // No comment marker, no line breaks, no surrounding whitespace.
    "[A-Za-z0-9_./<>@=-]([A-Za-z0-9_ ./<>@=-]{0,20}[A-Za-z0-9_./<>@=-])?"
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn last_duplicate_wins(entries in prop::collection::vec((key(), value()), 1..24)) {
        let text: String = entries.iter().map(|(k, v)| format!("{k} = {v}\n")).collect();
        let map = ConfigMap::parse(&text);

        let mut expected = BTreeMap::new();
        for (k, v) in &entries {
            expected.insert(k.clone(), v.clone());
        }

        prop_assert_eq!(map.len(), expected.len());
        for (k, v) in &expected {
            prop_assert_eq!(map.get(k), Some(v.as_str()));
        }
    }

    #[test]
    fn comments_never_contribute_entries(
        lines in prop::collection::vec("[^\n\r]{0,30}", 0..16),
        padding in prop::collection::vec("[ \t]{0,4}", 0..16),
    ) {
        let text: String = lines
            .iter()
            .zip(padding.iter().chain(std::iter::repeat(&String::new())))
            .map(|(line, pad)| format!("{pad}#{line}\n"))
            .collect();

        let map = ConfigMap::parse(&text);
        prop_assert!(map.is_empty());
        prop_assert!(
            matches!(AutoCommitConfig::from_map(&map), Err(ConfigError::MissingKey("WatchPath"))),
            "comment-only config must be rejected"
        );
    }

    #[test]
    fn trailing_comment_is_stripped(k in key(), v in value(), comment in "[^\n\r]{0,20}") {
        let map = ConfigMap::parse(&format!("{k}={v} #{comment}\n"));
        prop_assert_eq!(map.get(&k), Some(v.as_str()));
    }
}
