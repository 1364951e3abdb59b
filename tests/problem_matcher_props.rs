// tests/problem_matcher_props.rs

use std::path::Path;

use onsave::problem::{ProblemMatcher, extract_errors};
use proptest::prelude::*;

fn output_strategy() -> impl Strategy<Value = String> {
    let line = prop_oneof![
        "[a-z]{1,6}\\.rs:[1-9][0-9]{0,2}:[1-9]: error [a-z ]{0,12}",
        "warning: [a-z ]{0,12}",
        "[ \t]{0,3}",
        "[ -~]{0,20}",
    ];
    proptest::collection::vec(line, 0..12).prop_map(|lines| lines.join("\n"))
}

fn matcher() -> ProblemMatcher {
    ProblemMatcher::new(r"^(\S+):(\d+):(\d+): error", "${workspaceFolder}/${1}:${2}:${3}").unwrap()
}

fn is_sorted_unique(errors: &[String]) -> bool {
    errors.windows(2).all(|w| w[0] < w[1])
}

proptest! {
    #[test]
    fn extraction_is_deterministic_sorted_and_unique(raw in output_strategy()) {
        let ws = Path::new("/ws");
        let m = matcher();

        let first = extract_errors(&raw, Some(&m), ws);
        let second = extract_errors(&raw, Some(&m), ws);
        prop_assert_eq!(&first, &second);
        prop_assert!(is_sorted_unique(&first));
        for error in &first {
            prop_assert!(error.starts_with("/ws/"), "{}", error);
        }

        let plain = extract_errors(&raw, None, ws);
        prop_assert!(is_sorted_unique(&plain));
        for line in &plain {
            prop_assert!(!line.is_empty());
            prop_assert_eq!(line.trim(), line.as_str());
        }
    }

    #[test]
    fn line_order_and_repeats_do_not_matter(raw in output_strategy()) {
        let ws = Path::new("/ws");
        let m = matcher();
        let mut lines: Vec<&str> = raw.lines().collect();
        lines.reverse();
        let doubled = format!("{}\n{}", lines.join("\n"), raw);

        prop_assert_eq!(
            extract_errors(&raw, Some(&m), ws),
            extract_errors(&doubled, Some(&m), ws)
        );
        prop_assert_eq!(extract_errors(&raw, None, ws), extract_errors(&doubled, None, ws));
    }
}
