//! `.prsd` container format.
//!
//! A document may interleave prose with fenced code blocks:
//!
//! ```text
//! Some prose.
//!
//! :::prescribe
//! PROGRAM Hello
//!   OUTPUT "hi"
//! ENDPROGRAM
//! :::
//! ```
//!
//! Every fenced block is an independent program. A document with no
//! fences is one block containing the whole text.

/// Extract the program sources from a container document, in order.
pub fn extract_blocks(document: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;

    for line in document.lines() {
        match &mut current {
            None => {
                if line.trim() == ":::prescribe" {
                    current = Some(String::new());
                }
            }
            Some(block) => {
                if line.trim() == ":::" {
                    blocks.push(current.take().expect("block in progress"));
                } else {
                    block.push_str(line);
                    block.push('\n');
                }
            }
        }
    }
    // An unterminated fence runs to end of document.
    if let Some(block) = current {
        blocks.push(block);
    }

    if blocks.is_empty() {
        vec![document.to_string()]
    } else {
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fences_is_one_block() {
        let blocks = extract_blocks("PROGRAM P\nENDPROGRAM\n");
        assert_eq!(blocks, vec!["PROGRAM P\nENDPROGRAM\n"]);
    }

    #[test]
    fn extracts_fenced_blocks_in_order() {
        let doc = "intro prose\n\
                   :::prescribe\n\
                   PROGRAM A\n\
                   ENDPROGRAM\n\
                   :::\n\
                   middle prose\n\
                   :::prescribe\n\
                   PROGRAM B\n\
                   ENDPROGRAM\n\
                   :::\n\
                   outro\n";
        let blocks = extract_blocks(doc);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("PROGRAM A"));
        assert!(blocks[1].contains("PROGRAM B"));
        assert!(!blocks[0].contains("prose"));
    }

    #[test]
    fn fence_markers_tolerate_surrounding_whitespace() {
        let doc = "  :::prescribe  \nPROGRAM A\nENDPROGRAM\n  :::\n";
        let blocks = extract_blocks(doc);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].starts_with("PROGRAM A"));
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let doc = ":::prescribe\nPROGRAM A\nENDPROGRAM\n";
        let blocks = extract_blocks(doc);
        assert_eq!(blocks, vec!["PROGRAM A\nENDPROGRAM\n"]);
    }
}
