//! topic 解析辅助。

/// 取 topic 第二段作为设备标识；段数不足或该段为空时返回 None。
pub fn device_id_from_topic(topic: &str) -> Option<&str> {
    let mut parts = topic.split('/');
    parts.next()?;
    match parts.next() {
        Some(id) if !id.is_empty() => Some(id),
        _ => None,
    }
}
