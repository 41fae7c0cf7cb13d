use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;

use crate::error::{Error, Result};
use crate::quiz::SpeakingPassage;

static PASSAGE_DIR: Dir = include_dir!("src/passages");

/// Built-in read-aloud passages for practice without an API key
pub fn builtin() -> Result<Vec<SpeakingPassage>> {
    let mut passages = PASSAGE_DIR
        .files()
        .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
        .map(|file| {
            let text = file.contents_utf8().ok_or_else(|| {
                Error::MalformedResponse(format!("{} is not UTF-8", file.path().display()))
            })?;
            Ok(serde_json::from_str::<SpeakingPassage>(text)?)
        })
        .collect::<Result<Vec<_>>>()?;

    passages.sort_by(|a, b| a.title.cmp(&b.title));
    Ok(passages)
}

pub fn random_passage() -> Result<SpeakingPassage> {
    let passages = builtin()?;
    passages
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| Error::MalformedResponse("no built-in passages".into()))
}

pub fn by_title(title: &str) -> Result<Option<SpeakingPassage>> {
    Ok(builtin()?
        .into_iter()
        .find(|p| p.title.eq_ignore_ascii_case(title.trim())))
}
