use std::ops::Range;

/// One heading on the way down to a section: `# Alpha` > `## Notes`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub level: usize,
    pub text: String,
}

impl PathSegment {
    pub fn new(level: usize, text: impl Into<String>) -> Self {
        PathSegment {
            level,
            text: text.into(),
        }
    }

    /// The heading line this segment renders to
    pub fn heading_line(&self) -> String {
        format!("{} {}", "#".repeat(self.level.max(1)), self.text)
    }
}

/// A task block: marker line plus its update lines, verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub lines: Vec<String>,
    /// Line range in the source document (0-indexed, exclusive end)
    pub source_lines: Option<Range<usize>>,
}

impl TaskItem {
    pub fn new(lines: Vec<String>) -> Self {
        TaskItem {
            lines,
            source_lines: None,
        }
    }

    pub fn starts_at(&self, line: usize) -> bool {
        self.source_lines.as_ref().is_some_and(|r| r.start == line)
    }

    pub fn is_completed(&self) -> bool {
        self.lines.first().is_some_and(|l| l.starts_with("- [x] "))
    }
}

/// Consecutive task blocks, possibly separated by blank lines.
///
/// `gaps[i]` holds the blank lines between `items[i]` and `items[i + 1]`.
/// Reordering permutes items and leaves the gaps where they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    pub items: Vec<TaskItem>,
    pub gaps: Vec<Vec<String>>,
    pub source_lines: Option<Range<usize>>,
}

impl TaskList {
    pub fn new(items: Vec<TaskItem>) -> Self {
        let gaps = vec![Vec::new(); items.len().saturating_sub(1)];
        TaskList {
            items,
            gaps,
            source_lines: None,
        }
    }

    /// Append an item directly below the last one
    pub fn push(&mut self, item: TaskItem) {
        if !self.items.is_empty() {
            self.gaps.push(Vec::new());
        }
        self.items.push(item);
    }

    /// Remove an item together with one adjacent gap
    pub fn remove(&mut self, idx: usize) -> Option<TaskItem> {
        if idx >= self.items.len() {
            return None;
        }
        let item = self.items.remove(idx);
        if !self.gaps.is_empty() {
            self.gaps.remove(idx.saturating_sub(1).min(self.gaps.len() - 1));
        }
        Some(item)
    }

    /// Append every item of `other`, keeping its internal gaps
    pub fn append(&mut self, other: TaskList) {
        if other.items.is_empty() {
            return;
        }
        if !self.items.is_empty() {
            self.gaps.push(Vec::new());
        }
        self.items.extend(other.items);
        self.gaps.extend(other.gaps);
    }

    pub fn position_of_line(&self, line: usize) -> Option<usize> {
        self.items.iter().position(|item| item.starts_at(line))
    }

    pub fn line_count(&self) -> usize {
        self.items.iter().map(|i| i.lines.len()).sum::<usize>()
            + self.gaps.iter().map(|g| g.len()).sum::<usize>()
    }
}

/// A heading and everything below it up to the next heading of equal or
/// shallower depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub level: usize,
    pub title: String,
    /// The heading line, verbatim
    pub heading: String,
    pub children: Vec<Node>,
    pub source_lines: Option<Range<usize>>,
}

impl Section {
    /// A fresh, empty section for `segment`
    pub fn new(segment: &PathSegment) -> Self {
        Section {
            level: segment.level,
            title: segment.text.clone(),
            heading: segment.heading_line(),
            children: Vec::new(),
            source_lines: None,
        }
    }

    pub fn segment(&self) -> PathSegment {
        PathSegment::new(self.level, self.title.clone())
    }

    pub fn matches(&self, segment: &PathSegment) -> bool {
        self.level == segment.level && self.title.trim() == segment.text.trim()
    }
}

/// A node of the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Lines the tree does not model: paragraphs, blank lines, plain lists
    Literal {
        lines: Vec<String>,
        source_lines: Option<Range<usize>>,
    },
    Tasks(TaskList),
    Section(Section),
}

impl Node {
    pub fn literal(lines: Vec<String>) -> Node {
        Node::Literal {
            lines,
            source_lines: None,
        }
    }

    pub fn blank() -> Node {
        Node::literal(vec![String::new()])
    }

    pub fn source_lines(&self) -> Option<&Range<usize>> {
        match self {
            Node::Literal { source_lines, .. } => source_lines.as_ref(),
            Node::Tasks(list) => list.source_lines.as_ref(),
            Node::Section(section) => section.source_lines.as_ref(),
        }
    }

    pub fn line_count(&self) -> usize {
        match self {
            Node::Literal { lines, .. } => lines.len(),
            Node::Tasks(list) => list.line_count(),
            Node::Section(section) => {
                1 + section.children.iter().map(Node::line_count).sum::<usize>()
            }
        }
    }

    pub fn first_line(&self) -> Option<&str> {
        match self {
            Node::Literal { lines, .. } => lines.first().map(|l| l.as_str()),
            Node::Tasks(list) => list
                .items
                .first()
                .and_then(|i| i.lines.first())
                .map(|l| l.as_str()),
            Node::Section(section) => Some(section.heading.as_str()),
        }
    }

    pub fn last_line(&self) -> Option<&str> {
        match self {
            Node::Literal { lines, .. } => lines.last().map(|l| l.as_str()),
            Node::Tasks(list) => list
                .items
                .last()
                .and_then(|i| i.lines.last())
                .map(|l| l.as_str()),
            Node::Section(section) => section
                .children
                .iter()
                .rev()
                .find_map(Node::last_line)
                .or(Some(section.heading.as_str())),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Node::Literal { lines, .. } => lines.iter().all(|l| l.trim().is_empty()),
            _ => false,
        }
    }

    /// Drop source positions from this node and everything below it.
    /// Moved or copied nodes must not be found by line lookups.
    pub fn forget_source(&mut self) {
        match self {
            Node::Literal { source_lines, .. } => *source_lines = None,
            Node::Tasks(list) => {
                list.source_lines = None;
                for item in &mut list.items {
                    item.source_lines = None;
                }
            }
            Node::Section(section) => {
                section.source_lines = None;
                section.children.iter_mut().for_each(Node::forget_source);
            }
        }
    }
}

/// The whole document as a tree of sections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    pub children: Vec<Node>,
    pub trailing_newline: bool,
}

/// Address of a node: child indexes from the root down
pub type NodePath = Vec<usize>;

impl Outline {
    /// Children of the root (empty path) or of the section at `path`
    pub fn children_at(&self, path: &[usize]) -> Option<&Vec<Node>> {
        let mut children = &self.children;
        for &i in path {
            match children.get(i)? {
                Node::Section(section) => children = &section.children,
                _ => return None,
            }
        }
        Some(children)
    }

    pub fn children_at_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        let mut children = &mut self.children;
        for &i in path {
            match children.get_mut(i)? {
                Node::Section(section) => children = &mut section.children,
                _ => return None,
            }
        }
        Some(children)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (last, parent) = path.split_last()?;
        self.children_at(parent)?.get(*last)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (last, parent) = path.split_last()?;
        self.children_at_mut(parent)?.get_mut(*last)
    }

    /// Remove and return the node at `path`
    pub fn detach(&mut self, path: &[usize]) -> Option<Node> {
        let (last, parent) = path.split_last()?;
        let children = self.children_at_mut(parent)?;
        if *last < children.len() {
            Some(children.remove(*last))
        } else {
            None
        }
    }

    /// Path of the section whose heading is on `line` in the source
    pub fn find_section(&self, line: usize) -> Option<NodePath> {
        fn walk(children: &[Node], line: usize, path: &mut NodePath) -> bool {
            for (i, node) in children.iter().enumerate() {
                let Node::Section(section) = node else {
                    continue;
                };
                let Some(range) = section.source_lines.as_ref() else {
                    continue;
                };
                if range.start == line {
                    path.push(i);
                    return true;
                }
                if range.contains(&line) {
                    path.push(i);
                    if walk(&section.children, line, path) {
                        return true;
                    }
                    path.pop();
                }
            }
            false
        }
        let mut path = Vec::new();
        walk(&self.children, line, &mut path).then_some(path)
    }

    /// Path of the task list holding the task whose marker is on `line`,
    /// plus the item's index in that list
    pub fn find_task(&self, line: usize) -> Option<(NodePath, usize)> {
        fn walk(children: &[Node], line: usize, path: &mut NodePath) -> Option<usize> {
            for (i, node) in children.iter().enumerate() {
                match node {
                    Node::Tasks(list) => {
                        if let Some(k) = list.position_of_line(line) {
                            path.push(i);
                            return Some(k);
                        }
                    }
                    Node::Section(section) => {
                        if section.source_lines.as_ref().is_some_and(|r| r.contains(&line)) {
                            path.push(i);
                            if let Some(k) = walk(&section.children, line, path) {
                                return Some(k);
                            }
                            path.pop();
                        }
                    }
                    Node::Literal { .. } => {}
                }
            }
            None
        }
        let mut path = Vec::new();
        let k = walk(&self.children, line, &mut path)?;
        Some((path, k))
    }

    /// Headings from the root down to `path`, including the node itself
    /// when it is a section
    pub fn heading_path(&self, path: &[usize]) -> Vec<PathSegment> {
        let mut segments = Vec::new();
        let mut children = &self.children;
        for &i in path {
            match children.get(i) {
                Some(Node::Section(section)) => {
                    segments.push(section.segment());
                    children = &section.children;
                }
                _ => break,
            }
        }
        segments
    }

    /// Every task marker line in the source, in document order
    pub fn task_lines(&self) -> Vec<usize> {
        fn walk(children: &[Node], out: &mut Vec<usize>, only_completed: bool) {
            for node in children {
                match node {
                    Node::Tasks(list) => out.extend(
                        list.items
                            .iter()
                            .filter(|i| !only_completed || i.is_completed())
                            .filter_map(|i| i.source_lines.as_ref().map(|r| r.start)),
                    ),
                    Node::Section(section) => walk(&section.children, out, only_completed),
                    Node::Literal { .. } => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.children, &mut out, false);
        out
    }

    /// Marker lines of completed tasks, in document order
    pub fn completed_task_lines(&self) -> Vec<usize> {
        let mut out = self.task_lines();
        out.retain(|&line| {
            self.find_task(line)
                .and_then(|(path, k)| match self.node_at(&path) {
                    Some(Node::Tasks(list)) => list.items.get(k).map(TaskItem::is_completed),
                    _ => None,
                })
                .unwrap_or(false)
        });
        out
    }
}
