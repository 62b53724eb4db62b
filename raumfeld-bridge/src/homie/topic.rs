//! Topic layout below the base topic.

/// A retained definition or value message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: String,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Builds and parses topics for one base topic, e.g. `homie/raumfeld-bridge`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    base: String,
}

impl Topics {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `<base>/<attr>`
    pub fn device_attr(&self, attr: &str) -> String {
        format!("{}/{}", self.base, attr)
    }

    /// `<base>/<node>/<attr>`
    pub fn node_attr(&self, node: &str, attr: &str) -> String {
        format!("{}/{}/{}", self.base, node, attr)
    }

    /// `<base>/<node>/<property>/<attr>`
    pub fn property_attr(&self, node: &str, property: &str, attr: &str) -> String {
        format!("{}/{}/{}/{}", self.base, node, property, attr)
    }

    /// `<base>/<node>/<property>`
    pub fn value(&self, node: &str, property: &str) -> String {
        format!("{}/{}/{}", self.base, node, property)
    }

    /// Subscription filter matching every command topic
    pub fn set_filter(&self) -> String {
        format!("{}/+/+/set", self.base)
    }

    /// Split `<base>/<node>/<property>/set` into node and property.
    pub fn parse_set<'a>(&self, topic: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = topic.strip_prefix(self.base.as_str())?.strip_prefix('/')?;
        let mut parts = rest.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(node), Some(property), Some("set"), None)
                if !node.is_empty() && !property.is_empty() =>
            {
                Some((node, property))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_topic_layout() {
        let topics = Topics::new("homie/raumfeld-bridge/");
        assert_eq!(topics.base(), "homie/raumfeld-bridge");
        assert_eq!(topics.device_attr("$state"), "homie/raumfeld-bridge/$state");
        assert_eq!(topics.node_attr("kitchen", "$type"), "homie/raumfeld-bridge/kitchen/$type");
        assert_eq!(
            topics.property_attr("kitchen", "volume", "$format"),
            "homie/raumfeld-bridge/kitchen/volume/$format"
        );
        assert_eq!(topics.value("kitchen", "mute"), "homie/raumfeld-bridge/kitchen/mute");
        assert_eq!(topics.set_filter(), "homie/raumfeld-bridge/+/+/set");
    }

    #[rstest]
    #[case("homie/rf/kitchen/volume/set", Some(("kitchen", "volume")))]
    #[case("homie/rf/kitchen/onoff/set", Some(("kitchen", "onoff")))]
    #[case("homie/rf/kitchen/volume", None)]
    #[case("homie/rf/kitchen/volume/set/extra", None)]
    #[case("homie/rf//volume/set", None)]
    #[case("homie/other/kitchen/volume/set", None)]
    #[case("homie/rfx/kitchen/volume/set", None)]
    fn test_parse_set(#[case] topic: &str, #[case] expected: Option<(&str, &str)>) {
        assert_eq!(Topics::new("homie/rf").parse_set(topic), expected);
    }
}
