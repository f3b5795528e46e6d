//! Prompt augmentation with capability references
//!
//! A capability reference is a labeled block of reference text (usually the
//! schema) embedded in the task so the model can find where it starts and
//! ends.

/// Label for the schema block injected into the task
pub const TABLE_DEFINITIONS_CAP_REF: &str = "TABLE_DEFINITIONS";

/// Delimiter surrounding a capability reference
pub const CAP_REF_DELIMITER: &str = "---------";

/// Frame a user request as a database task
pub fn database_task(request: &str) -> String {
    format!("Fulfill this database query: {}. ", request.trim())
}

/// Append a labeled reference block to a prompt.
///
/// The body sits between an opening `--------- LABEL ---------` line and a
/// closing `--------- END LABEL ---------` line and is copied verbatim.
pub fn add_cap_ref(base_prompt: &str, instruction: &str, label: &str, body: &str) -> String {
    format!(
        "{} {}\n\n{}\n{}\n{}",
        base_prompt.trim_end(),
        instruction.trim(),
        open_marker(label),
        body,
        close_marker(label)
    )
}

/// Recover the body of a capability reference added by [`add_cap_ref`].
///
/// The block is the last one in the prompt, so markers quoted earlier (for
/// instance in the user's request) are skipped. The body itself must not
/// contain an opening marker line for the same label.
pub fn extract_cap_ref<'a>(prompt: &'a str, label: &str) -> Option<&'a str> {
    let open = format!("\n{}\n", open_marker(label));
    let close = format!("\n{}", close_marker(label));

    let end = prompt.rfind(&close)?;
    let start = prompt[..end].rfind(&open)? + open.len();
    Some(&prompt[start..end])
}

fn open_marker(label: &str) -> String {
    format!("{} {} {}", CAP_REF_DELIMITER, label, CAP_REF_DELIMITER)
}

fn close_marker(label: &str) -> String {
    format!("{} END {} {}", CAP_REF_DELIMITER, label, CAP_REF_DELIMITER)
}

/// Build the seed prompt for a run: the framed request plus the schema block
pub fn seed_prompt(request: &str, table_definitions: &str) -> String {
    add_cap_ref(
        &database_task(request),
        &format!(
            "Use these {} to satisfy the database query.",
            TABLE_DEFINITIONS_CAP_REF
        ),
        TABLE_DEFINITIONS_CAP_REF,
        table_definitions,
    )
}
