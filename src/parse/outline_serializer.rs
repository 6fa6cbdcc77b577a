use crate::model::document::Document;
use crate::model::outline::{Node, Outline};

/// Flatten a section tree back into a document. A tree with no lines left
/// is the empty document.
pub fn serialize_outline(outline: &Outline) -> Document {
    let mut lines = Vec::new();
    flatten_into(&outline.children, &mut lines);
    let trailing_newline = outline.trailing_newline && !lines.is_empty();
    Document::new(lines, trailing_newline)
}

/// Append the lines of `nodes` to `out`, in order
pub fn flatten_into(nodes: &[Node], out: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Literal { lines, .. } => out.extend(lines.iter().cloned()),
            Node::Tasks(list) => {
                for (i, item) in list.items.iter().enumerate() {
                    if i > 0
                        && let Some(gap) = list.gaps.get(i - 1)
                    {
                        out.extend(gap.iter().cloned());
                    }
                    out.extend(item.lines.iter().cloned());
                }
            }
            Node::Section(section) => {
                out.push(section.heading.clone());
                flatten_into(&section.children, out);
            }
        }
    }
}

/// The lines of a single node
pub fn node_lines(node: &Node) -> Vec<String> {
    let mut out = Vec::new();
    flatten_into(std::slice::from_ref(node), &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::outline::{PathSegment, Section, TaskItem, TaskList};

    #[test]
    fn test_serialize_built_tree() {
        let mut section = Section::new(&PathSegment::new(2, "Done"));
        let mut list = TaskList::new(vec![TaskItem::new(vec!["- [x] a".into()])]);
        list.push(TaskItem::new(vec!["- [x] b".into(), "  - 2024-01-01: ok".into()]));
        section.children.push(Node::Tasks(list));
        let outline = Outline {
            children: vec![Node::literal(vec!["# Top".into(), String::new()]), Node::Section(section)],
            trailing_newline: true,
        };
        assert_eq!(
            serialize_outline(&outline).to_string(),
            "# Top\n\n## Done\n- [x] a\n- [x] b\n  - 2024-01-01: ok\n"
        );
    }

    #[test]
    fn test_node_lines_of_section() {
        let section = Section::new(&PathSegment::new(3, "Empty"));
        assert_eq!(node_lines(&Node::Section(section)), vec!["### Empty"]);
    }
}
