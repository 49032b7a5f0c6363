use catalog_sync::config::{BRO_BASE_URL, REQUIRED_KEYS, SHOPIFY_BASE_URL};
use std::{collections::HashMap, env, fs, path::Path};

fn parse_env_lines(contents: &str) -> Vec<(usize, String, String)> {
    let mut out = Vec::new();
    for (idx, raw) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let mut line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("export ") {
            line = rest.trim();
        }
        // Find the first '=' only
        let Some(eq) = line.find('=') else {
            continue;
        };
        let key = line[..eq].trim().to_string();
        let mut val = line[eq + 1..].trim().to_string();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        } else if let Some(hash_pos) = val.find('#') {
            // Only treat as comment if there is whitespace before '#'
            let prefix = &val[..hash_pos];
            if prefix.ends_with(' ') || prefix.ends_with('\t') {
                val = prefix.trim_end().to_string();
            }
        }
        if key.is_empty() {
            continue;
        }
        out.push((line_no, key, val));
    }
    out
}

/// Problems that make the file unusable, in key order.
fn check_entries(first_seen: &HashMap<String, (usize, String)>) -> Vec<String> {
    let mut errors = Vec::new();
    for key in REQUIRED_KEYS {
        match first_seen.get(key) {
            None => errors.push(format!("missing {key}")),
            Some((line, v)) if v.trim().is_empty() => {
                errors.push(format!("{key} at line {line} is empty"))
            }
            Some(_) => {}
        }
    }
    for key in [BRO_BASE_URL, SHOPIFY_BASE_URL] {
        if let Some((line, v)) = first_seen.get(key) {
            if !v.is_empty() && url::Url::parse(v).is_err() {
                errors.push(format!("{key} at line {line} is not a URL: '{v}'"));
            }
        }
    }
    errors
}

fn main() {
    catalog_sync::util::env::init_env();
    // Optional arg: path to .env (default ".env")
    let path = env::args().nth(1).unwrap_or_else(|| ".env".to_string());
    if !Path::new(&path).exists() {
        eprintln!("No .env found at {}", path);
        std::process::exit(2);
    }
    let contents = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            std::process::exit(2);
        }
    };

    let mut first_seen: HashMap<String, (usize, String)> = HashMap::new();
    let mut duplicates: Vec<(String, usize, usize)> = Vec::new();
    for (line, key, val) in parse_env_lines(&contents) {
        if let Some((first_line, _)) = first_seen.get(&key) {
            duplicates.push((key, *first_line, line));
        } else {
            first_seen.insert(key, (line, val));
        }
    }

    if !duplicates.is_empty() {
        println!(
            "[WARN] Duplicate keys found (dotenv is first-value-wins; later values are ignored):"
        );
        for (key, l1, l2) in &duplicates {
            println!("  - {}: line {} vs line {}", key, l1, l2);
        }
    }

    let errors = check_entries(&first_seen);
    for e in &errors {
        eprintln!("[ERROR] {e}");
    }
    if errors.is_empty() {
        println!("Validation: PASS");
        std::process::exit(0);
    } else {
        println!("Validation: FAIL");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen(contents: &str) -> HashMap<String, (usize, String)> {
        let mut out = HashMap::new();
        for (line, key, val) in parse_env_lines(contents) {
            out.entry(key).or_insert((line, val));
        }
        out
    }

    #[test]
    fn parses_quotes_exports_and_comments() {
        let parsed = parse_env_lines(
            "# comment\nexport BRO_PUBLIC_KEY=\"abc\"\nSHOPIFY_STORE=shop # trailing\nSKU_PREFIX=A#B\nnoequals\n",
        );
        assert_eq!(
            parsed,
            vec![
                (2, "BRO_PUBLIC_KEY".to_string(), "abc".to_string()),
                (3, "SHOPIFY_STORE".to_string(), "shop".to_string()),
                (4, "SKU_PREFIX".to_string(), "A#B".to_string()),
            ]
        );
    }

    #[test]
    fn flags_missing_and_empty_required_keys() {
        let errors = check_entries(&seen("BRO_PUBLIC_KEY=p\nBRO_SECRET_KEY=\nSHOPIFY_STORE=s\n"));
        assert_eq!(
            errors,
            vec![
                "BRO_SECRET_KEY at line 2 is empty".to_string(),
                "missing SHOPIFY_TOKEN".to_string(),
            ]
        );
    }

    #[test]
    fn flags_bad_base_url() {
        let errors = check_entries(&seen(
            "BRO_PUBLIC_KEY=p\nBRO_SECRET_KEY=s\nSHOPIFY_STORE=s\nSHOPIFY_TOKEN=t\nBRO_BASE_URL=dev brolexy\n",
        ));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("BRO_BASE_URL at line 5"));
    }
}
