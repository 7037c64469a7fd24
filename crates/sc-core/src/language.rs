//! Language code normalization.
//!
//! Subtitle evidence arrives tagged with either ISO 639-1 two-letter codes
//! (`de`, `ja`) or ISO 639-2 three-letter codes, and the three-letter codes
//! come in both terminological (`deu`, `fra`, `zho`) and bibliographic
//! (`ger`, `fre`, `chi`) flavours. [`normalize`] folds all of them onto the
//! two-letter form. Every comparison of language identity in subcover goes
//! through it.

/// ISO 639-2 codes (both T and B variants) and their ISO 639-1 equivalent.
pub const THREE_LETTER_CODES: &[(&str, &str)] = &[
    ("alb", "sq"),
    ("sqi", "sq"),
    ("ara", "ar"),
    ("arm", "hy"),
    ("hye", "hy"),
    ("baq", "eu"),
    ("eus", "eu"),
    ("ben", "bn"),
    ("bos", "bs"),
    ("bul", "bg"),
    ("bur", "my"),
    ("mya", "my"),
    ("cat", "ca"),
    ("chi", "zh"),
    ("zho", "zh"),
    ("hrv", "hr"),
    ("cze", "cs"),
    ("ces", "cs"),
    ("dan", "da"),
    ("dut", "nl"),
    ("nld", "nl"),
    ("eng", "en"),
    ("est", "et"),
    ("fil", "tl"),
    ("tgl", "tl"),
    ("fin", "fi"),
    ("fre", "fr"),
    ("fra", "fr"),
    ("geo", "ka"),
    ("kat", "ka"),
    ("ger", "de"),
    ("deu", "de"),
    ("gre", "el"),
    ("ell", "el"),
    ("heb", "he"),
    ("hin", "hi"),
    ("hun", "hu"),
    ("ice", "is"),
    ("isl", "is"),
    ("ind", "id"),
    ("ita", "it"),
    ("jpn", "ja"),
    ("kor", "ko"),
    ("lav", "lv"),
    ("lit", "lt"),
    ("mac", "mk"),
    ("mkd", "mk"),
    ("may", "ms"),
    ("msa", "ms"),
    ("nor", "no"),
    ("nob", "nb"),
    ("nno", "nn"),
    ("per", "fa"),
    ("fas", "fa"),
    ("pol", "pl"),
    ("por", "pt"),
    ("rum", "ro"),
    ("ron", "ro"),
    ("rus", "ru"),
    ("srp", "sr"),
    ("slo", "sk"),
    ("slk", "sk"),
    ("slv", "sl"),
    ("spa", "es"),
    ("swe", "sv"),
    ("tam", "ta"),
    ("tel", "te"),
    ("tha", "th"),
    ("tur", "tr"),
    ("ukr", "uk"),
    ("urd", "ur"),
    ("vie", "vi"),
    ("wel", "cy"),
    ("cym", "cy"),
];

/// Normalize a language code to its canonical two-letter form.
///
/// Input is case-insensitive. Known three-letter codes map to their
/// two-letter equivalent; anything else (two-letter codes, regional tags,
/// unknown codes) is returned lowercased and otherwise unchanged. The
/// function is total and idempotent.
pub fn normalize(code: &str) -> String {
    let lower = code.to_lowercase();
    THREE_LETTER_CODES
        .iter()
        .find(|(three, _)| *three == lower)
        .map(|(_, two)| (*two).to_string())
        .unwrap_or(lower)
}

/// Whether two raw codes name the same language once normalized.
pub fn same_language(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}
