//! 报表 token 流抽取
//!
//! 报表查看器把表格渲染为带样式的 div，而非语义化的 table。每个匹配的文本框
//! 先输出自身文本，再输出其紧邻兄弟元素的文本（渲染器的标记特性）。

use scraper::Html;

use crate::error::Result;
use crate::parser::html::{next_element_sibling, selector, text_of};

/// 报表文本框的类名组合
pub const TEXT_CELL_SELECTOR: &str = "div.canGrowTextBoxInTablix.cannotShrinkTextBoxInTablix";

/// 仅回显类名的文本视为噪声
const MARKER_CLASS: &str = "canGrowTextBoxInTablix";

/// 有序的文本 token 序列，抽取与解析之间唯一的接口
pub type TokenStream = Vec<String>;

/// 从报表文档中抽取 token 流
pub fn extract_tokens(document: &Html) -> Result<TokenStream> {
    let cells = selector(TEXT_CELL_SELECTOR)?;
    let mut tokens = Vec::new();

    for cell in document.select(&cells) {
        let text = text_of(&cell);
        if !text.is_empty() && !text.contains(MARKER_CLASS) {
            tokens.push(text);
        }

        if let Some(sibling) = next_element_sibling(&cell) {
            let sibling_text = text_of(&sibling);
            if !sibling_text.is_empty() {
                tokens.push(sibling_text);
            }
        }
    }

    Ok(tokens)
}

/// 文档中全部 span 的文本（成绩单汇总区）
pub fn extract_span_texts(document: &Html) -> Result<Vec<String>> {
    let spans = selector("span")?;
    Ok(document.select(&spans).map(|s| text_of(&s)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(text: &str) -> String {
        format!(r#"<div class="canGrowTextBoxInTablix cannotShrinkTextBoxInTablix">{text}</div>"#)
    }

    #[test]
    fn test_extracts_cells_in_document_order() {
        let html = format!(
            "<html><body><div>{}</div><div>{}</div></body></html>",
            cell("Lecture No. 1"),
            cell("02-Sep-2024")
        );
        let doc = Html::parse_document(&html);
        assert_eq!(
            extract_tokens(&doc).unwrap(),
            vec!["Lecture No. 1", "02-Sep-2024"]
        );
    }

    #[test]
    fn test_merges_adjacent_sibling_text() {
        let html = format!(
            "<div>{}<div>  Present </div></div><div>{}<span></span></div>",
            cell("Lecture No. 3"),
            cell("Dr. Ayesha Khan")
        );
        let doc = Html::parse_document(&html);
        assert_eq!(
            extract_tokens(&doc).unwrap(),
            vec!["Lecture No. 3", "Present", "Dr. Ayesha Khan"]
        );
    }

    #[test]
    fn test_skips_empty_and_marker_echo() {
        let html = format!(
            "<div>{}<div>Tail</div></div><div>{}</div>",
            cell("   "),
            cell("canGrowTextBoxInTablix")
        );
        let doc = Html::parse_document(&html);
        // Empty cell still contributes its sibling.
        assert_eq!(extract_tokens(&doc).unwrap(), vec!["Tail"]);
    }

    #[test]
    fn test_span_texts() {
        let doc = Html::parse_document(
            "<p><span>CGPA :</span><span> 3.41 / 4.00 </span></p>",
        );
        assert_eq!(
            extract_span_texts(&doc).unwrap(),
            vec!["CGPA :", "3.41 / 4.00"]
        );
    }
}
