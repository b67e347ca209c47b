/// 発話テキストの前処理: 正規化してからターンに追加する
pub struct PostProcessor;

impl PostProcessor {
    /// 正規化: 全角英数→半角、制御文字の除去、連続空白の圧縮、前後トリム。
    /// 文字そのもの（アラビア文字の字形など）は書き換えない。
    pub fn normalize(text: &str) -> String {
        let mut result = String::with_capacity(text.len());

        for ch in text.chars() {
            match ch {
                // 全角英数字 → 半角
                '\u{FF01}'..='\u{FF5E}' => {
                    result.push(char::from_u32(ch as u32 - 0xFEE0).unwrap_or(ch));
                }
                // 全角スペース → 半角
                '\u{3000}' => result.push(' '),
                // 改行以外の制御文字は除去
                '\n' => result.push(ch),
                '\r' => {}
                c if c.is_control() && c != '\t' => {}
                _ => result.push(ch),
            }
        }

        let compressed = compress_whitespace(&result);
        compressed.trim().to_string()
    }

    /// 正規化後に空ならば None
    pub fn utterance(text: &str) -> Option<String> {
        let normalized = Self::normalize(text);
        if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        }
    }
}

fn compress_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_space = false;

    for ch in s.chars() {
        if ch == ' ' || ch == '\t' {
            if !prev_space {
                result.push(' ');
            }
            prev_space = true;
        } else {
            // 改行は保持
            prev_space = false;
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fullwidth_to_halfwidth() {
        assert_eq!(PostProcessor::normalize("Ｈｅｌｌｏ　Ｗｏｒｌｄ"), "Hello World");
        assert_eq!(PostProcessor::normalize("１２３"), "123");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(PostProcessor::normalize("hello   world"), "hello world");
        assert_eq!(PostProcessor::normalize("  hello  "), "hello");
        assert_eq!(PostProcessor::normalize("line1\r\nline2"), "line1\nline2");
    }

    #[test]
    fn test_normalize_keeps_arabic_letter_forms() {
        // アラビア語の kaf/yeh もウルドゥー語の ک/ی もそのまま
        assert_eq!(
            PostProcessor::normalize(" \u{0643}\u{064A}\u{0627} "),
            "\u{0643}\u{064A}\u{0627}"
        );
        assert_eq!(
            PostProcessor::normalize("\u{06A9}\u{06CC}\u{0627}"),
            "\u{06A9}\u{06CC}\u{0627}"
        );
    }

    #[test]
    fn test_normalize_strips_control_chars() {
        assert_eq!(PostProcessor::normalize("hi\u{0007} there"), "hi there");
    }

    #[test]
    fn test_utterance_rejects_blank() {
        assert_eq!(PostProcessor::utterance(" \t "), None);
        assert_eq!(PostProcessor::utterance(" salaam "), Some("salaam".to_string()));
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(PostProcessor::normalize(""), "");
    }
}
