//! Change path syntax.
//!
//! A change path names a location in a record tree: field names joined by
//! `.`, with list membership written as `name[i]` (slot present in both
//! snapshots), `name[+i]` (inserted) or `name[-i]` (removed).
//!
//! ```text
//! replication_specs[0].region_configs[+1]
//! ```

/// Append a field name to a path. An empty prefix is the record root.
pub fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// `path[i]`: a list slot present in both snapshots.
pub fn index(path: &str, i: usize) -> String {
    format!("{}[{}]", path, i)
}

/// `path[+i]`: a list element present only in the new snapshot.
pub fn added(path: &str, i: usize) -> String {
    format!("{}[+{}]", path, i)
}

/// `path[-i]`: a list element present only in the old snapshot.
pub fn removed(path: &str, i: usize) -> String {
    format!("{}[-{}]", path, i)
}

/// Last dotted segment of `path`.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Last dotted segment with any trailing `[...]` suffix stripped.
///
/// `replication_specs[0].zone_name` -> `zone_name`,
/// `replication_specs[0]` -> `replication_specs`.
pub fn bare_name(path: &str) -> &str {
    let segment = last_segment(path);
    if segment.ends_with(']') {
        if let Some(open) = segment.find('[') {
            return &segment[..open];
        }
    }
    segment
}

/// True if the last step of `path` is a list index, in any of its forms.
pub fn is_list_index(path: &str) -> bool {
    last_segment(path).ends_with(']')
}

/// Path without its last step, `None` at the root.
///
/// The last step is either a trailing `[...]` index or a dotted field name,
/// so `a.b[0]` -> `a.b` and `a.b` -> `a`.
pub fn parent(path: &str) -> Option<&str> {
    if path.ends_with(']') {
        return path.rfind('[').map(|open| &path[..open]);
    }
    path.rfind('.').map(|dot| &path[..dot])
}

/// The removal marker for a slot path: `a.b[3]` -> `a.b[-3]`.
///
/// Returns `None` unless the last step is a plain index.
pub fn as_removed(path: &str) -> Option<String> {
    let (list, idx) = split_index(path)?;
    idx.parse::<usize>().ok().map(|i| removed(list, i))
}

fn split_index(path: &str) -> Option<(&str, &str)> {
    let body = path.strip_suffix(']')?;
    let open = body.rfind('[')?;
    Some((&body[..open], &body[open + 1..]))
}
