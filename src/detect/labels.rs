use std::path::Path;

use crate::config::UNKNOWN_CLASS_LABEL;
use crate::error::AgentError;

/// 加载类别名称文件
///
/// 每行一个类别，行号即类别ID。
pub fn load_class_names(path: &Path) -> Result<Vec<String>, AgentError> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| AgentError::ClassList { path: path.to_path_buf() })?;
    Ok(parse_class_names(&content))
}

pub fn parse_class_names(content: &str) -> Vec<String> {
    content.lines().map(|line| line.trim_end_matches('\r').to_string()).collect()
}

/// 按类别ID取名称，越界时返回 "Unknown"
pub fn class_name(names: &[String], class_id: usize) -> &str {
    names.get(class_id).map(String::as_str).unwrap_or(UNKNOWN_CLASS_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_including_crlf() {
        let names = parse_class_names("person\r\nbicycle\ncar\n");
        assert_eq!(names, vec!["person", "bicycle", "car"]);
    }

    #[test]
    fn unknown_for_out_of_range_ids() {
        let names = parse_class_names("person\nbicycle");
        assert_eq!(class_name(&names, 1), "bicycle");
        assert_eq!(class_name(&names, 79), "Unknown");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_class_names(Path::new("does/not/exist.txt")).unwrap_err();
        assert_eq!(err.to_string(), "Failed to open classlist at: does/not/exist.txt");
    }
}
