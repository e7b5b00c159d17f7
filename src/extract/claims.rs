//! English claims extraction from EPO patent XML.
//!
//! Streams the document with quick-xml and keeps going past malformed markup:
//! a parse error ends the walk, and whatever was collected by then is used.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::debug;

/// Claim number to claim text, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claims(Vec<(String, String)>);

impl Claims {
    /// Insert or replace. A replaced claim keeps its original position.
    pub fn insert(&mut self, num: String, text: String) {
        match self.0.iter_mut().find(|(n, _)| *n == num) {
            Some(entry) => entry.1 = text,
            None => self.0.push((num, text)),
        }
    }

    pub fn get(&self, num: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == num)
            .map(|(_, text)| text.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }
}

impl Serialize for Claims {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (num, text) in &self.0 {
            map.serialize_entry(num, text)?;
        }
        map.end()
    }
}

/// One JSON Lines record: `{"pn": ..., "c": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimsRecord {
    pub pn: String,
    pub c: Claims,
}

/// Result of parsing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimsOutcome {
    Record(ClaimsRecord),
    /// Root has no country, doc-number or kind.
    NoPatentNumber,
    /// No non-empty claim under an English claims block.
    NoEnglishClaims,
}

impl ClaimsOutcome {
    /// Status note stored for documents that yield no record.
    pub fn note(&self) -> Option<&'static str> {
        match self {
            Self::Record(_) => None,
            Self::NoPatentNumber => Some("no patent number"),
            Self::NoEnglishClaims => Some("no English claims"),
        }
    }
}

/// Extract the patent number and English claims, if any.
pub fn extract_claims(xml: &[u8]) -> Option<ClaimsRecord> {
    match parse_claims(xml) {
        ClaimsOutcome::Record(record) => Some(record),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    EnglishClaims,
    Claim,
    ClaimText,
    Other,
}

struct OpenElement {
    name: Vec<u8>,
    frame: Frame,
}

#[derive(Default)]
struct Walk {
    root_seen: bool,
    country: String,
    number: String,
    kind: String,
    stack: Vec<OpenElement>,
    english_depth: usize,
    /// Number and finished claim-text blocks of the open claim.
    claim: Option<(String, Vec<String>)>,
    /// Text pieces of the open outermost claim-text.
    block: Option<Vec<String>>,
    claims: Claims,
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(Cow::into_owned))
}

impl Walk {
    fn open(&mut self, e: &BytesStart<'_>) -> Frame {
        if !self.root_seen {
            self.root_seen = true;
            self.country = attr(e, b"country").unwrap_or_default();
            self.number = attr(e, b"doc-number").unwrap_or_default();
            self.kind = attr(e, b"kind").unwrap_or_default();
        }

        match e.local_name().as_ref() {
            b"claims" if attr(e, b"lang").as_deref() == Some("en") => {
                self.english_depth += 1;
                Frame::EnglishClaims
            }
            b"claim" if self.english_depth > 0 && self.claim.is_none() => {
                let num = attr(e, b"num").unwrap_or_default();
                let num = num.trim().trim_start_matches('0').to_string();
                self.claim = Some((num, Vec::new()));
                Frame::Claim
            }
            b"claim-text" if self.claim.is_some() && self.block.is_none() => {
                self.block = Some(Vec::new());
                Frame::ClaimText
            }
            _ => Frame::Other,
        }
    }

    fn close(&mut self, frame: Frame) {
        match frame {
            Frame::EnglishClaims => self.english_depth = self.english_depth.saturating_sub(1),
            Frame::ClaimText => {
                if let (Some(pieces), Some((_, blocks))) = (self.block.take(), self.claim.as_mut()) {
                    let block = pieces.join(" ");
                    if !block.is_empty() {
                        blocks.push(block);
                    }
                }
            }
            Frame::Claim => {
                if let Some((num, blocks)) = self.claim.take() {
                    let text = blocks.join("\n").trim().to_string();
                    if !num.is_empty() && !text.is_empty() {
                        self.claims.insert(num, text);
                    }
                }
            }
            Frame::Other => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(pieces) = self.block.as_mut() {
            let text = text.trim();
            if !text.is_empty() {
                pieces.push(text.to_string());
            }
        }
    }

    /// Close elements up to and including the innermost one named `name`.
    /// Stray end tags are ignored.
    fn end(&mut self, name: &[u8]) {
        let Some(pos) = self.stack.iter().rposition(|open| open.name == name) else {
            return;
        };
        while self.stack.len() > pos {
            if let Some(open) = self.stack.pop() {
                self.close(open.frame);
            }
        }
    }

    fn finish(mut self) -> ClaimsOutcome {
        while let Some(open) = self.stack.pop() {
            self.close(open.frame);
        }

        let pn = format!("{}{}{}", self.country, self.number, self.kind)
            .trim()
            .to_string();
        if pn.is_empty() {
            return ClaimsOutcome::NoPatentNumber;
        }
        if self.claims.is_empty() {
            return ClaimsOutcome::NoEnglishClaims;
        }
        ClaimsOutcome::Record(ClaimsRecord {
            pn,
            c: self.claims,
        })
    }
}

/// Parse a patent document into a claims record or a reason there is none.
pub fn parse_claims(xml: &[u8]) -> ClaimsOutcome {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    reader.check_end_names(false);

    let mut walk = Walk::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let frame = walk.open(e);
                walk.stack.push(OpenElement {
                    name: e.name().as_ref().to_vec(),
                    frame,
                });
            }
            Ok(Event::Empty(ref e)) => {
                let frame = walk.open(e);
                walk.close(frame);
            }
            Ok(Event::End(ref e)) => walk.end(e.name().as_ref()),
            Ok(Event::Text(ref e)) => match e.unescape() {
                Ok(text) => walk.text(&text),
                Err(_) => walk.text(&String::from_utf8_lossy(e)),
            },
            Ok(Event::CData(e)) => walk.text(&String::from_utf8_lossy(&e.into_inner())),
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(
                    "XML parse error at byte {}, keeping partial result: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    walk.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGET: &str = r#"<ep-patent-document country="EP" doc-number="1234567" kind="B1"><claims lang="en"><claim num="0001"><claim-text>A widget.</claim-text></claim></claims></ep-patent-document>"#;

    #[test]
    fn test_minimal_document() {
        let record = extract_claims(WIDGET.as_bytes()).unwrap();
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"pn":"EP1234567B1","c":{"1":"A widget."}}"#
        );
    }

    #[test]
    fn test_only_english_claims_are_used() {
        let xml = r#"<ep-patent-document country="EP" doc-number="1" kind="B1">
            <claims lang="de"><claim num="0001"><claim-text>Ein Ding.</claim-text></claim></claims>
            <claims lang="fr"><claim num="0001"><claim-text>Un truc.</claim-text></claim></claims>
        </ep-patent-document>"#;
        assert_eq!(parse_claims(xml.as_bytes()), ClaimsOutcome::NoEnglishClaims);
        assert_eq!(
            parse_claims(xml.as_bytes()).note(),
            Some("no English claims")
        );
    }

    #[test]
    fn test_missing_patent_number() {
        let xml = r#"<ep-patent-document><claims lang="en"><claim num="1"><claim-text>x</claim-text></claim></claims></ep-patent-document>"#;
        assert_eq!(parse_claims(xml.as_bytes()), ClaimsOutcome::NoPatentNumber);
    }

    #[test]
    fn test_claim_text_joins_descendants_and_blocks() {
        let xml = r#"<ep-patent-document country="EP" doc-number="2" kind="B1">
          <claims lang="en">
            <claim num="0001">
              <claim-text>A device comprising:
                <claim-text>a <b>first</b> part;</claim-text>
                <claim-text>a second part.</claim-text>
              </claim-text>
            </claim>
            <claim num="0002">
              <claim-text>The device of <claim-ref idref="c1">claim 1</claim-ref>.</claim-text>
              <claim-text>Further detail.</claim-text>
            </claim>
          </claims>
        </ep-patent-document>"#;
        let record = extract_claims(xml.as_bytes()).unwrap();
        assert_eq!(
            record.c.get("1"),
            Some("A device comprising: a first part; a second part.")
        );
        assert_eq!(
            record.c.get("2"),
            Some("The device of claim 1 .\nFurther detail.")
        );
    }

    #[test]
    fn test_claim_numbers_and_empty_claims() {
        let xml = r#"<doc country="EP" doc-number="3" kind="B1"><claims lang="en">
            <claim num="0000"><claim-text>No number.</claim-text></claim>
            <claim num="0002"><claim-text>   </claim-text></claim>
            <claim num="0010"><claim-text>Ten.</claim-text></claim>
            <claim num="0003"><claim-text>Three.</claim-text></claim>
        </claims></doc>"#;
        let record = extract_claims(xml.as_bytes()).unwrap();
        let order: Vec<&str> = record.c.iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["10", "3"]);
    }

    #[test]
    fn test_duplicate_claim_number_keeps_position() {
        let xml = r#"<doc country="EP" doc-number="4" kind="B1"><claims lang="en">
            <claim num="1"><claim-text>First.</claim-text></claim>
            <claim num="2"><claim-text>Second.</claim-text></claim>
            <claim num="01"><claim-text>Replaced.</claim-text></claim>
        </claims></doc>"#;
        let record = extract_claims(xml.as_bytes()).unwrap();
        assert_eq!(
            serde_json::to_string(&record.c).unwrap(),
            r#"{"1":"Replaced.","2":"Second."}"#
        );
    }

    #[test]
    fn test_entities_and_cdata() {
        let xml = r#"<doc country="EP" doc-number="5" kind="B1"><claims lang="en">
            <claim num="1"><claim-text>A &amp; B <![CDATA[< C]]></claim-text></claim>
        </claims></doc>"#;
        let record = extract_claims(xml.as_bytes()).unwrap();
        assert_eq!(record.c.get("1"), Some("A & B < C"));
    }

    #[test]
    fn test_truncated_document_keeps_partial_claims() {
        let xml = r#"<doc country="EP" doc-number="6" kind="B1"><claims lang="en">
            <claim num="1"><claim-text>Complete.</claim-text></claim>
            <claim num="2"><claim-text>Cut off"#;
        let record = extract_claims(xml.as_bytes()).unwrap();
        assert_eq!(record.c.get("1"), Some("Complete."));
        assert_eq!(record.c.get("2"), Some("Cut off"));
    }

    #[test]
    fn test_mismatched_end_tag_is_tolerated() {
        let xml = r#"<doc country="EP" doc-number="7" kind="B1"><claims lang="en">
            <claim num="1"><claim-text>Fine <i>text</b> here.</claim-text></claim>
        </claims></doc>"#;
        let record = extract_claims(xml.as_bytes()).unwrap();
        assert_eq!(record.c.get("1"), Some("Fine text here."));
    }

    #[test]
    fn test_garbage_is_not_a_record() {
        assert!(extract_claims(b"not xml at all").is_none());
        assert!(extract_claims(b"").is_none());
    }

    #[test]
    fn test_non_ascii_text_is_preserved() {
        let xml = "<doc country=\"EP\" doc-number=\"8\" kind=\"B1\"><claims lang=\"en\"><claim num=\"1\"><claim-text>Temperature \u{2265} 20 \u{b0}C.</claim-text></claim></claims></doc>";
        let record = extract_claims(xml.as_bytes()).unwrap();
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            "{\"pn\":\"EP8B1\",\"c\":{\"1\":\"Temperature \u{2265} 20 \u{b0}C.\"}}"
        );
    }
}
