use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use strsim::damerau_levenshtein;
use unicode_normalization::UnicodeNormalization;

/// Alias → canonical skill mapping (O(1) lookup).
///
/// Kept deliberately smaller than a taxonomy service: only spellings that
/// show up in requirement forms and candidate profiles often enough to skew
/// match ratios.
static ALIAS_TO_CANONICAL: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let aliases: &[(&str, &[&str])] = &[
        // JavaScript ecosystem
        (
            "javascript",
            &["js", "javascript", "java script", "ecmascript", "es6"],
        ),
        ("typescript", &["ts", "typescript", "type script"]),
        ("nodejs", &["node.js", "node js", "nodejs", "node"]),
        (
            "react",
            &["reactjs", "react.js", "react js", "react", "react18"],
        ),
        ("angular", &["angularjs", "angular.js", "angular", "angular2"]),
        ("vue", &["vue.js", "vuejs", "vue js", "vue"]),
        ("nextjs", &["next.js", "nextjs", "next js"]),
        // Backend
        (
            "spring",
            &["spring boot", "springboot", "spring framework", "spring"],
        ),
        ("django", &["django rest framework", "drf", "django"]),
        ("express", &["express.js", "expressjs", "express js", "express"]),
        ("rails", &["ruby on rails", "ror", "rails"]),
        ("laravel", &["laravel framework", "php laravel", "laravel"]),
        ("dotnet", &[".net", "dot net", "asp.net", "dotnet", "c#", "csharp"]),
        // Languages
        ("python", &["python3", "python 3", "py", "python"]),
        ("java", &["java8", "java11", "java17", "core java", "java"]),
        ("golang", &["go", "golang", "go lang"]),
        ("cplusplus", &["c++", "cpp", "c plus plus"]),
        ("php", &["php7", "php8", "php"]),
        ("ruby", &["ruby lang", "ruby"]),
        ("kotlin", &["kotlin jvm", "kotlin"]),
        ("swift", &["ios swift", "swift"]),
        // Databases
        ("postgresql", &["postgres", "pg", "postgresql", "postgre sql"]),
        ("mysql", &["my sql", "mysql", "mariadb"]),
        ("mongodb", &["mongo", "mongo db", "mongodb"]),
        ("redis", &["redis cache", "redis"]),
        ("oracle", &["oracle db", "oracle database", "pl/sql", "oracle"]),
        // Cloud / DevOps
        ("aws", &["amazon web services", "amazon aws", "aws cloud", "aws"]),
        ("azure", &["microsoft azure", "ms azure", "azure"]),
        ("gcp", &["google cloud platform", "google cloud", "gcp"]),
        ("docker", &["docker container", "containerization", "docker"]),
        ("kubernetes", &["k8s", "kube", "kubernetes"]),
        ("jenkins", &["jenkins ci", "jenkins"]),
        ("terraform", &["infrastructure as code", "iac", "terraform"]),
        // Data
        ("spark", &["apache spark", "pyspark", "spark"]),
        ("kafka", &["apache kafka", "kafka"]),
        ("pandas", &["python pandas", "pandas"]),
        ("tensorflow", &["tensor flow", "tensorflow"]),
        ("pytorch", &["torch", "py torch", "pytorch"]),
        // Mobile
        ("reactnative", &["react native", "react-native", "reactnative"]),
        ("flutter", &["dart flutter", "flutter"]),
        ("android", &["android development", "android sdk", "android"]),
        // Adjacent roles that land in the same skill fields
        ("selenium", &["selenium webdriver", "selenium testing", "selenium"]),
        ("salesforce", &["sfdc", "salesforce crm", "salesforce"]),
        ("sap", &["sap abap", "sap hana", "sap"]),
        ("excel", &["ms excel", "microsoft excel", "advanced excel", "excel"]),
        ("tally", &["tally erp", "tally prime", "tally"]),
    ];

    let mut map = HashMap::new();
    for (canonical, alias_list) in aliases {
        map.insert(*canonical, *canonical);
        for alias in *alias_list {
            map.insert(*alias, *canonical);
        }
    }
    map
});

/// Keys with separators stripped, for tolerating minor spelling variants.
static COMPACT_ALIAS_TO_CANONICAL: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    for (alias, canonical) in ALIAS_TO_CANONICAL.iter() {
        let compact = compact_key(alias);
        map.entry(compact).or_insert(*canonical);
    }

    map
});

pub fn nfkc_lower_trim(input: &str) -> String {
    input.nfkc().collect::<String>().trim().to_lowercase()
}

fn compact_key(input: &str) -> String {
    input
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '_' | '/' | ','))
        .collect()
}

fn match_canonical_token(token: &str) -> Option<String> {
    if token.is_empty() {
        return None;
    }

    if let Some(canonical) = ALIAS_TO_CANONICAL.get(token) {
        return Some(canonical.to_string());
    }

    let compact = compact_key(token);
    if let Some(canonical) = COMPACT_ALIAS_TO_CANONICAL.get(&compact) {
        return Some((*canonical).to_string());
    }

    fuzzy_match_canonical(&compact)
}

fn split_segments(input: &str) -> impl Iterator<Item = String> + '_ {
    input
        .split(|c: char| matches!(c, ' ' | '/' | ',' | ';' | '|' | '+'))
        .map(nfkc_lower_trim)
        .filter(|s| !s.is_empty())
}

fn fuzzy_match_canonical(compact: &str) -> Option<String> {
    if compact.len() < 4 {
        return None;
    }

    let mut best: Option<(&str, usize)> = None;
    for (alias, canonical) in COMPACT_ALIAS_TO_CANONICAL.iter() {
        // Avoid fuzzy-matching short canonical tokens (java, go, php) to
        // reduce false positives on brief inputs. Short aliases are only
        // reachable via the exact lookups above.
        if alias.len() < 5 || compact.len() < 5 || canonical.len() < 5 {
            continue;
        }

        let distance = damerau_levenshtein(compact, alias);
        if distance == 0 {
            return Some((*canonical).to_string());
        }

        let len = compact.len().max(alias.len());
        let acceptable = distance == 1 || (len >= 8 && distance == 2);
        if !acceptable {
            continue;
        }

        match best {
            None => best = Some((*canonical, distance)),
            Some((_, best_dist)) if distance < best_dist => best = Some((*canonical, distance)),
            _ => {}
        }
    }

    best.map(|(canonical, _)| canonical.to_string())
}

/// Canonical form of a single skill string.
pub fn canonical_skill(skill: &str) -> String {
    let normalized = nfkc_lower_trim(skill);
    if let Some(canonical) = match_canonical_token(&normalized) {
        return canonical;
    }

    for segment in split_segments(skill) {
        if let Some(canonical) = match_canonical_token(&segment) {
            return canonical;
        }
    }

    normalized
}

/// Canonical skill set for overlap and exclusion checks.
pub fn canonical_skill_set(skills: &[String]) -> HashSet<String> {
    skills
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| canonical_skill(s))
        .collect()
}

/// Union of several skill lists, deduplicated case-insensitively while
/// keeping the first-seen spelling for display.
pub fn union_preserving_case(lists: &[&[String]]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for list in lists {
        for skill in list.iter() {
            let trimmed = skill.trim();
            if trimmed.is_empty() {
                continue;
            }
            if seen.insert(canonical_skill(trimmed)) {
                merged.push(trimmed.to_string());
            }
        }
    }

    merged
}

/// Case-insensitive substring check used for free-text sweeps over
/// headline/summary fields.
pub fn text_mentions(text: &str, needle: &str) -> bool {
    let needle = nfkc_lower_trim(needle);
    if needle.is_empty() {
        return false;
    }
    nfkc_lower_trim(text).contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_and_alias_equivalence() {
        assert_eq!(canonical_skill("JavaScript"), "javascript");
        assert_eq!(canonical_skill("js"), "javascript");
        assert_eq!(canonical_skill("K8s"), "kubernetes");
        assert_eq!(canonical_skill("React.js"), "react");
        assert_eq!(canonical_skill("C#"), "dotnet");
    }

    #[test]
    fn tolerates_small_typos_for_known_aliases() {
        assert_eq!(canonical_skill("javascirpt"), "javascript");
        assert_eq!(canonical_skill("kuberntes"), "kubernetes");
        assert_eq!(canonical_skill("salesfrce"), "salesforce");
    }

    #[test]
    fn does_not_fuzz_short_tokens() {
        assert_eq!(canonical_skill("javaa"), "javaa");
        assert_eq!(canonical_skill("gol"), "gol");
        assert_eq!(canonical_skill("x"), "x");
    }

    #[test]
    fn unknown_skill_lowercases() {
        assert_eq!(canonical_skill("MyInternalTool"), "myinternaltool");
    }

    #[test]
    fn skill_sets_meet_across_spellings() {
        let required = canonical_skill_set(&["React.js".to_string(), "K8s".to_string()]);
        let candidate = canonical_skill_set(&["react".to_string(), "kubernetes".to_string()]);
        assert_eq!(required, candidate);
    }

    #[test]
    fn union_keeps_first_spelling_and_drops_case_duplicates() {
        let primary = vec!["React".to_string(), "Node".to_string()];
        let additional = vec!["react".to_string(), "  ".to_string(), "AWS".to_string()];

        let merged = union_preserving_case(&[&primary, &additional]);

        assert_eq!(
            merged,
            vec!["React".to_string(), "Node".to_string(), "AWS".to_string()]
        );
    }

    #[test]
    fn text_mentions_is_case_insensitive() {
        assert!(text_mentions("Senior React developer", "react"));
        assert!(!text_mentions("Senior React developer", "angular"));
        assert!(!text_mentions("anything", "  "));
    }
}
