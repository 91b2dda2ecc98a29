use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ribbon::Vec2;

/// Reads a stroke file: a JSON array of `[x, y]` screen-space pairs.
pub fn load_stroke(path: &Path) -> Result<Vec<Vec2>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read stroke file {}", path.display()))?;
    parse_stroke(&contents).with_context(|| format!("invalid stroke file {}", path.display()))
}

pub fn parse_stroke(json: &str) -> Result<Vec<Vec2>> {
    let pairs: Vec<[f32; 2]> = serde_json::from_str(json)?;
    if pairs.len() < 2 {
        bail!("a stroke needs at least two points, found {}", pairs.len());
    }
    if let Some(index) = pairs
        .iter()
        .position(|[x, y]| !(x.is_finite() && y.is_finite()))
    {
        bail!("stroke point {index} is not a finite coordinate");
    }
    Ok(pairs.into_iter().map(Vec2::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs() {
        let points = parse_stroke("[[10, 20], [30.5, 40]]").unwrap();
        assert_eq!(points, vec![Vec2::new(10.0, 20.0), Vec2::new(30.5, 40.0)]);
    }

    #[test]
    fn rejects_short_or_malformed_strokes() {
        assert!(parse_stroke("[[1, 2]]").is_err());
        assert!(parse_stroke("[[1, 2, 3], [4, 5]]").is_err());
        assert!(parse_stroke(r#"{"points": []}"#).is_err());
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stroke.json");
        fs::write(&path, "[[0, 0], [5, 5], [10, 0]]").unwrap();
        assert_eq!(load_stroke(&path).unwrap().len(), 3);
        assert!(load_stroke(&dir.path().join("missing.json")).is_err());
    }
}
