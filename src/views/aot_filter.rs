/// Reduce an objdump listing to the functions belonging to one class
use once_cell::sync::Lazy;
use regex::Regex;

static ANY_SYMBOL_HEADER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]+\s+<.*>:").ok());

/// Returned when no function in the listing could be attributed to the class
pub const NO_RELEVANT_CODE: &str = "No relevant assembly code found for the class.\n\n\
    Possible causes:\n\
    - The methods were inlined into other code by the native compiler\n\
    - The code was optimized away as unused\n\
    - Symbol names were renamed or mangled differently in the native image\n";

/// Keep the blocks whose header names `symbol` (or any `main`) and their
/// instruction lines, indented with whitespace collapsed.
pub fn filter_listing(listing: &str, symbol: &str) -> String {
    let header = symbol_header(symbol);
    let mut out = String::new();
    let mut in_block = false;

    for line in listing.lines() {
        if line.trim().is_empty() || line.contains(".debug_") {
            continue;
        }

        let opens = header.as_ref().map_or(false, |re| re.is_match(line))
            || line.contains(" main>:");
        if opens {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(line.trim());
            out.push('\n');
            in_block = true;
            continue;
        }

        if !in_block {
            continue;
        }
        if ANY_SYMBOL_HEADER
            .as_ref()
            .map_or(false, |re| re.is_match(line))
        {
            in_block = false;
            continue;
        }
        if line.contains('\t') && !line.starts_with('.') {
            out.push_str("  ");
            out.push_str(&collapse_whitespace(line));
            out.push('\n');
        }
    }

    if out.trim().is_empty() {
        NO_RELEVANT_CODE.to_string()
    } else {
        out
    }
}

fn symbol_header(symbol: &str) -> Option<Regex> {
    let pattern = format!(r"^[0-9a-fA-F]+\s+<{}.*>:", regex::escape(symbol));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Unusable symbol pattern {:?}: {}", pattern, e);
            None
        }
    }
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}
