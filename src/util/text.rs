//! Message template formatting.

/// Substitute each `%s` in `template` with the next argument.
///
/// Templates come from manifest data, so a placeholder count that does not
/// match the argument count is not an error: the template is returned
/// unformatted with the arguments appended.
pub fn safe_format(template: &str, args: &[String]) -> String {
    let placeholders = template.matches("%s").count();
    if placeholders != args.len() {
        if args.is_empty() {
            return template.to_string();
        }
        return format!("{} with parameters {{{}}}", template, args.join(", "));
    }

    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    for arg in args {
        match rest.find("%s") {
            Some(at) => {
                result.push_str(&rest[..at]);
                result.push_str(arg);
                rest = &rest[at + 2..];
            }
            None => break,
        }
    }
    result.push_str(rest);
    result
}

/// Join items with a separator after formatting each with `Display`.
pub fn join_on<T: std::fmt::Display>(separator: &str, items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}
