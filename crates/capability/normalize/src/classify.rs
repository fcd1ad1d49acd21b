use domain::DeviceFamily;

const MESH_PREFIX: &str = "zigbee2mqtt/";
const METER_SEGMENT: &str = "emeter";
const RELAY_SEGMENT: &str = "relay";
const STATE_SUFFIX: &str = "/STATE";
const SENSOR_SUFFIX: &str = "/SENSOR";

/// 报文类别，对应一个解码器。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `.../emeter/<channel>/<field>`，裸数值。
    PowerMeter,
    /// topic 含 `relay/<channel>` 段，"on"/其它。
    Relay,
    /// `.../STATE`，固定结构 JSON。
    State,
    /// `.../SENSOR`，带 ENERGY 块的 JSON。
    Sensor,
    /// `zigbee2mqtt/...`，任意 JSON 对象。
    MeshSensor,
    /// 兜底：payload 是 JSON 对象。
    GenericJson,
    /// 兜底：payload 不是 JSON 对象。
    GenericScalar,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::PowerMeter => "power_meter",
            MessageKind::Relay => "relay",
            MessageKind::State => "state",
            MessageKind::Sensor => "sensor",
            MessageKind::MeshSensor => "mesh_sensor",
            MessageKind::GenericJson => "generic_json",
            MessageKind::GenericScalar => "generic_scalar",
        }
    }
}

struct Rule {
    kind: MessageKind,
    matches: fn(&str) -> bool,
}

// 顺序即优先级，第一个命中者胜出。
const RULES: [Rule; 5] = [
    Rule {
        kind: MessageKind::PowerMeter,
        matches: is_meter_channel,
    },
    Rule {
        kind: MessageKind::Relay,
        matches: is_relay_channel,
    },
    Rule {
        kind: MessageKind::State,
        matches: is_state_topic,
    },
    Rule {
        kind: MessageKind::Sensor,
        matches: is_sensor_topic,
    },
    Rule {
        kind: MessageKind::MeshSensor,
        matches: is_mesh_topic,
    },
];

/// 按固定优先级分类；topic 无法判定时看 payload 是否为 JSON 对象。
pub fn classify(topic: &str, payload: &[u8]) -> MessageKind {
    if let Some(rule) = RULES.iter().find(|rule| (rule.matches)(topic)) {
        return rule.kind;
    }
    match serde_json::from_slice::<serde_json::Value>(payload) {
        Ok(serde_json::Value::Object(_)) => MessageKind::GenericJson,
        _ => MessageKind::GenericScalar,
    }
}

/// 自动注册时的设备族推断。
pub fn family_hint(topic: &str) -> DeviceFamily {
    if is_mesh_topic(topic) {
        DeviceFamily::ZigbeeSensor
    } else if topic.split('/').any(|segment| segment == METER_SEGMENT) {
        DeviceFamily::ShellyEm
    } else if is_state_topic(topic) || is_sensor_topic(topic) {
        DeviceFamily::NousAt
    } else {
        DeviceFamily::AutoDetected
    }
}

/// 返回 (channel, field)：`emeter` 段后紧跟数字通道段，再跟最后一段字段名。
pub(crate) fn meter_channel(topic: &str) -> Option<(&str, &str)> {
    let segments: Vec<&str> = topic.split('/').collect();
    let n = segments.len();
    if n < 3 {
        return None;
    }
    let (marker, channel, field) = (segments[n - 3], segments[n - 2], segments[n - 1]);
    if marker == METER_SEGMENT && is_index(channel) && !field.is_empty() {
        Some((channel, field))
    } else {
        None
    }
}

/// 返回 channel：topic 中任意位置的 `relay/<数字>` 段对，取第一个。
///
/// `shellies/<id>/relay/0`、`shellies/<id>/relay/0/power` 都命中通道 0。
pub(crate) fn relay_channel(topic: &str) -> Option<&str> {
    let segments: Vec<&str> = topic.split('/').collect();
    segments
        .windows(2)
        .find(|pair| pair[0] == RELAY_SEGMENT && is_index(pair[1]))
        .map(|pair| pair[1])
}

fn is_meter_channel(topic: &str) -> bool {
    meter_channel(topic).is_some()
}

fn is_relay_channel(topic: &str) -> bool {
    relay_channel(topic).is_some()
}

fn is_state_topic(topic: &str) -> bool {
    topic.ends_with(STATE_SUFFIX)
}

fn is_sensor_topic(topic: &str) -> bool {
    topic.ends_with(SENSOR_SUFFIX)
}

fn is_mesh_topic(topic: &str) -> bool {
    topic.starts_with(MESH_PREFIX)
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}
