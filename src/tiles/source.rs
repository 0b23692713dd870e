use crate::core::geo::TileCoord;
use crate::{MapError, Result};
use std::fmt;
use std::str::FromStr;

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    X,
    Y,
    Z,
    Subdomain,
    Retina,
}

/// URL template such as `https://{s}.host/{z}/{x}/{y}.json`.
///
/// Placeholders are `{x}`, `{y}`, `{z}`, `{s}` (subdomain picked from the
/// tile position) and `{r}` (retina suffix, always empty here). Unknown
/// placeholders are rejected when the template is parsed, not when a tile is
/// requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
    segments: Vec<Segment>,
    subdomains: Vec<String>,
}

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                break;
            };
            literal.push_str(&rest[..open]);
            let name = rest[open + 1..close].trim();
            let segment = match name {
                "x" => Segment::X,
                "y" => Segment::Y,
                "z" => Segment::Z,
                "s" => Segment::Subdomain,
                "r" => Segment::Retina,
                other => {
                    return Err(MapError::InvalidTemplate(format!(
                        "no value provided for variable {{{}}} in {}",
                        other, template
                    )))
                }
            };
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(segment);
            rest = &rest[close + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
            subdomains: vec!["a".into(), "b".into(), "c".into()],
        })
    }

    /// Replaces the subdomains used for `{s}`
    pub fn with_subdomains<I, S>(mut self, subdomains: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = subdomains.into_iter().map(Into::into).collect();
        if self.subdomains.is_empty() && self.segments.contains(&Segment::Subdomain) {
            return Err(MapError::InvalidTemplate(format!(
                "{} uses {{s}} but no subdomains are configured",
                self.raw
            )));
        }
        Ok(self)
    }

    /// Parses a new template string but keeps this template's subdomains
    pub fn rebind(&self, template: &str) -> Result<Self> {
        Self::parse(template)?.with_subdomains(self.subdomains.iter().cloned())
    }

    pub fn subdomains(&self) -> &[String] {
        &self.subdomains
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn subdomain(&self, coord: &TileCoord) -> &str {
        if self.subdomains.is_empty() {
            return "";
        }
        let index = (coord.x as i64 + coord.y as i64).unsigned_abs() as usize % self.subdomains.len();
        &self.subdomains[index]
    }
}

impl TileSource for UrlTemplate {
    fn url(&self, coord: TileCoord) -> String {
        let mut url = String::with_capacity(self.raw.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::X => url.push_str(&coord.x.to_string()),
                Segment::Y => url.push_str(&coord.y.to_string()),
                Segment::Z => url.push_str(&coord.z.to_string()),
                Segment::Subdomain => url.push_str(self.subdomain(&coord)),
                Segment::Retina => {}
            }
        }
        url
    }
}

impl FromStr for UrlTemplate {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_coordinates() {
        let template = UrlTemplate::parse("https://host/{z}/{x}/{y}.json").unwrap();
        assert_eq!(
            template.url(TileCoord::new(3, 5, 4)),
            "https://host/4/3/5.json"
        );
    }

    #[test]
    fn test_tolerates_spaces_and_retina() {
        let template = UrlTemplate::parse("/tiles/{ z }/{x}/{y}{r}.geojson?v=1").unwrap();
        assert_eq!(template.url(TileCoord::new(1, 2, 3)), "/tiles/3/1/2.geojson?v=1");
    }

    #[test]
    fn test_subdomain_rotation() {
        let template = UrlTemplate::parse("https://{s}.host/{z}/{x}/{y}.json").unwrap();
        assert_eq!(template.url(TileCoord::new(0, 0, 1)), "https://a.host/1/0/0.json");
        assert_eq!(template.url(TileCoord::new(1, 0, 1)), "https://b.host/1/1/0.json");
        assert_eq!(template.url(TileCoord::new(1, 1, 1)), "https://c.host/1/1/1.json");

        let err = UrlTemplate::parse("https://{s}.host/{z}/{x}/{y}.json")
            .unwrap()
            .with_subdomains(Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, MapError::InvalidTemplate(_)));
    }

    #[test]
    fn test_rejects_unknown_placeholders() {
        let err = UrlTemplate::parse("https://host/{z}/{x}/{y}.json?key={apikey}").unwrap_err();
        assert!(matches!(err, MapError::InvalidTemplate(_)));
    }

    #[test]
    fn test_unclosed_brace_is_literal() {
        let template = UrlTemplate::parse("https://host/{z}/{x}/{y}{").unwrap();
        assert_eq!(template.url(TileCoord::new(1, 2, 3)), "https://host/3/1/2{");
    }
}
