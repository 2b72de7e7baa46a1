use std::collections::BTreeSet;

use serde::Deserialize;

use crate::db::models::Soal;
use crate::db::types::QuestionKind;

/// A submitted answer: one value, or several for multi-select questions.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub(crate) enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AnswerValue {
    /// Stored form: trimmed, multi-values joined with `,`, blanks become `None`.
    pub(crate) fn into_stored(self) -> Option<String> {
        let stored = match self {
            AnswerValue::Single(value) => value.trim().to_string(),
            AnswerValue::Multiple(values) => values
                .iter()
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .collect::<Vec<_>>()
                .join(","),
        };
        if stored.is_empty() {
            None
        } else {
            Some(stored)
        }
    }
}

fn choice_set(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Essay and scale answers score zero until corrected by hand.
pub(crate) fn score_answer(soal: &Soal, answer: Option<&str>) -> f64 {
    let (Some(answer), Some(correct)) = (answer, soal.jawaban_benar.as_deref()) else {
        return 0.0;
    };

    let matched = match soal.jenis_soal {
        QuestionKind::PilihanGanda => answer.trim().eq_ignore_ascii_case(correct.trim()),
        QuestionKind::MultiChoice => {
            let expected = choice_set(correct);
            !expected.is_empty() && choice_set(answer) == expected
        }
        QuestionKind::Essay | QuestionKind::Skala => false,
    };

    if matched {
        soal.skor
    } else {
        0.0
    }
}
