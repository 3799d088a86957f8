use crate::model::Section;

/// Renders one section in the `=== title ===\nbody\n\n` shape every downstream
/// agent prompt template expects.
pub fn render_section(section: &Section) -> String {
    format!("=== {} ===\n{}\n\n", section.title, section.body)
}

pub fn render_all(sections: &[Section]) -> String {
    sections.iter().map(render_section).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectionKind;

    #[test]
    fn renders_title_and_body_with_trailing_blank_line() {
        let s = Section::new(SectionKind::Workstream, "workstream", "00-F001-01: do the thing");
        let rendered = render_section(&s);
        assert!(rendered.starts_with("=== workstream ===\n"));
        assert!(rendered.ends_with("\n\n"));
        assert!(rendered.contains("00-F001-01: do the thing"));
    }

    #[test]
    fn render_all_concatenates_in_order() {
        let sections = vec![
            Section::new(SectionKind::Workstream, "a", "first"),
            Section::new(SectionKind::AcceptanceCriteria, "b", "second"),
        ];
        let rendered = render_all(&sections);
        assert!(rendered.find("first").unwrap() < rendered.find("second").unwrap());
    }
}
