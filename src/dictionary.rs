use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::generator::ContentGenerator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub word: String,
    #[serde(default)]
    pub phonetic: String,
    pub part_of_speech: String,
    pub definitions: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// Look a word up with the content generator.
pub async fn lookup<G: ContentGenerator>(generator: &G, word: &str) -> Result<DictionaryEntry> {
    let word = word.trim();
    if word.is_empty() {
        return Err(Error::InvalidInput("no word to look up".into()));
    }

    info!("looking up {word:?}");
    let schema = json!({
        "type": "OBJECT",
        "properties": {
            "word": {"type": "STRING"},
            "phonetic": {"type": "STRING", "description": "IPA transcription"},
            "part_of_speech": {"type": "STRING"},
            "definitions": {"type": "ARRAY", "items": {"type": "STRING"}},
            "examples": {"type": "ARRAY", "items": {"type": "STRING"}},
            "synonyms": {"type": "ARRAY", "items": {"type": "STRING"}}
        },
        "required": ["word", "phonetic", "part_of_speech", "definitions", "examples", "synonyms"]
    });
    let prompt = format!(
        "Act as a learner's dictionary for English. Give the entry for \"{word}\": IPA \
         transcription, part of speech, up to three plain-English definitions, two example \
         sentences and a few synonyms."
    );

    let value = generator.generate_json(&prompt, &schema).await?;
    let entry: DictionaryEntry = serde_json::from_value(value)?;
    if entry.definitions.is_empty() {
        return Err(Error::MalformedResponse(format!("no definitions for {word:?}")));
    }
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::fake::FakeGenerator;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_lookup_trims_and_parses() {
        let generator = FakeGenerator::replying(vec![json!({
            "word": "serene",
            "phonetic": "/səˈriːn/",
            "part_of_speech": "adjective",
            "definitions": ["calm and peaceful"],
            "examples": ["a serene lake"],
            "synonyms": ["calm", "tranquil"]
        })]);

        let entry = lookup(&generator, "  serene ").await.unwrap();
        assert_eq!(entry.word, "serene");
        assert_eq!(entry.synonyms.len(), 2);
        assert!(generator.last_prompt().unwrap().contains("\"serene\""));
    }

    #[tokio::test]
    async fn test_lookup_rejects_empty_word() {
        let generator = FakeGenerator::default();
        assert_matches!(lookup(&generator, " ").await, Err(Error::InvalidInput(_)));
        assert!(generator.last_prompt().is_none());
    }

    #[tokio::test]
    async fn test_lookup_without_definitions_is_malformed() {
        let generator = FakeGenerator::replying(vec![json!({
            "word": "xyzzy",
            "part_of_speech": "noun",
            "definitions": []
        })]);
        assert_matches!(
            lookup(&generator, "xyzzy").await,
            Err(Error::MalformedResponse(_))
        );
    }
}
