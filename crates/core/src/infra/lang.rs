//! 応答テキストの言語判定（読み上げ言語の選択用）

use whatlang::Lang;

/// これ未満の信頼度の判定結果は採用しない
const MIN_CONFIDENCE: f64 = 0.3;

/// テキストの言語を判定し、translate_tts の `tl` コードで返す。
///
/// 判定できない、信頼度が低い、または読み上げ非対応の言語なら None。
pub fn detect_language(text: &str) -> Option<&'static str> {
    let info = whatlang::detect(text)?;
    log::debug!(
        "Language detected: {} (confidence {:.2}, reliable={})",
        info.lang().code(),
        info.confidence(),
        info.is_reliable()
    );

    if info.confidence() < MIN_CONFIDENCE {
        return None;
    }
    tts_code(info.lang())
}

/// 判定できなければ fallback を返す
pub fn detect_or<'a>(text: &str, fallback: &'a str) -> &'a str {
    detect_language(text).unwrap_or(fallback)
}

/// ISO 639-3 → translate_tts の言語コード（非対応は None）
fn tts_code(lang: Lang) -> Option<&'static str> {
    let code = match lang.code() {
        "afr" => "af",
        "ara" => "ar",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" => "zh-CN",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "est" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "iw",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jw",
        "jpn" => "ja",
        "kan" => "kn",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" => "lv",
        "mal" => "ml",
        "mar" => "mr",
        "mya" => "my",
        "nep" => "ne",
        "nld" => "nl",
        "nob" => "no",
        "pol" => "pl",
        "por" => "pt",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tur" => "tr",
        "ukr" => "uk",
        "urd" => "ur",
        "vie" => "vi",
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urdu() {
        let text = "آج موسم بہت اچھا ہے اور میں بازار جا رہا ہوں تاکہ کچھ پھل اور سبزیاں خرید سکوں۔";
        assert_eq!(detect_language(text), Some("ur"));
    }

    #[test]
    fn test_english() {
        let text = "How are you today? I hope everything is going well with your work and your family.";
        assert_eq!(detect_language(text), Some("en"));
    }

    #[test]
    fn test_french_is_not_read_as_english() {
        let text = "Bonjour, je voudrais savoir quelle est la meilleure façon de préparer une bonne tasse de café le matin.";
        assert_eq!(detect_language(text), Some("fr"));
    }

    #[test]
    fn test_spanish() {
        let text = "Hola, me gustaría saber cuál es la mejor manera de preparar una buena taza de café por la mañana.";
        assert_eq!(detect_language(text), Some("es"));
    }

    #[test]
    fn test_arabic_is_not_read_as_urdu() {
        let text = "مرحبا بكم في المدينة، نحن سعداء جدا بمساعدتكم في كل ما تحتاجونه اليوم وغدا إن شاء الله.";
        assert_eq!(detect_language(text), Some("ar"));
    }

    #[test]
    fn test_tts_code_mapping() {
        assert_eq!(tts_code(Lang::Urd), Some("ur"));
        assert_eq!(tts_code(Lang::Hin), Some("hi"));
        assert_eq!(tts_code(Lang::Cmn), Some("zh-CN"));
        // translate_tts にペルシア語の音声はない
        assert_eq!(tts_code(Lang::Pes), None);
    }

    #[test]
    fn test_no_letters_falls_back() {
        assert_eq!(detect_language("123 !!"), None);
        assert_eq!(detect_or("123", "en"), "en");
    }
}
