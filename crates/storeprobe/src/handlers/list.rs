//! List command handler

use storefront_probe::{builtin_suite, TestSuite};

use crate::commands::ListArgs;

/// Print the built-in journeys
pub fn execute_list(args: &ListArgs) {
    for line in list_lines(&builtin_suite(), args.filter.as_deref()) {
        println!("{line}");
    }
}

/// One line per journey, marking the ones that load the saved session
#[must_use]
pub fn list_lines(suite: &TestSuite, filter: Option<&str>) -> Vec<String> {
    suite
        .matching(filter)
        .into_iter()
        .map(|case| {
            if case.needs_session {
                format!("{} [session]", case.name)
            } else {
                case.name.clone()
            }
        })
        .collect()
}
