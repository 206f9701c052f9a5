use crate::provider::UserRecord;

/// Case-insensitive substring search over email and display name.
///
/// A blank query returns the input unchanged. Matches keep their input order.
pub fn filter(query: &str, users: &[UserRecord]) -> Vec<UserRecord> {
    if query.trim().is_empty() {
        return users.to_vec();
    }

    let needle = query.to_lowercase();
    users
        .iter()
        .filter(|user| {
            contains(user.email.as_deref(), &needle) || contains(user.display_name.as_deref(), &needle)
        })
        .cloned()
        .collect()
}

fn contains(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|value| value.to_lowercase().contains(needle))
}
