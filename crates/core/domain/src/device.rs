/// 设备族：注册时写入注册中心的分类标签，决定默认 topic 布局。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFamily {
    ShellyEm,
    NousAt,
    ZigbeeSensor,
    AutoDetected,
}

impl DeviceFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceFamily::ShellyEm => "shelly_em",
            DeviceFamily::NousAt => "nous_at",
            DeviceFamily::ZigbeeSensor => "zigbee_sensor",
            DeviceFamily::AutoDetected => "auto_detected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "shelly_em" => Some(DeviceFamily::ShellyEm),
            "nous_at" => Some(DeviceFamily::NousAt),
            "zigbee_sensor" => Some(DeviceFamily::ZigbeeSensor),
            "auto_detected" => Some(DeviceFamily::AutoDetected),
            _ => None,
        }
    }

    /// 该设备族固定的 topic 布局；没有固定布局的返回空。
    pub fn topic_templates(&self, serial: &str) -> Vec<String> {
        match self {
            DeviceFamily::ShellyEm => ["energy", "voltage", "power", "total"]
                .iter()
                .map(|field| format!("shellies/{}/emeter/0/{}", serial, field))
                .collect(),
            DeviceFamily::NousAt => vec![
                format!("tele/{}/STATE", serial),
                format!("tele/{}/SENSOR", serial),
            ],
            DeviceFamily::ZigbeeSensor | DeviceFamily::AutoDetected => Vec::new(),
        }
    }
}

impl std::fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 注册中心中的设备。
///
/// 采集链路只读取与新建，不修改已有设备。
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub serial: String,
    pub topics: Vec<String>,
    pub family: Option<DeviceFamily>,
    pub owner: Option<i64>,
    pub description: Option<String>,
}

impl Device {
    pub fn new(serial: impl Into<String>, topics: Vec<String>) -> Self {
        Self {
            serial: serial.into(),
            topics,
            family: None,
            owner: None,
            description: None,
        }
    }
}
