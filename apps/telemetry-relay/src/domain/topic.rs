//! Broker Topics
//!
//! Every topic the relay subscribes to is a variant of [`InboundTopic`].
//! Dispatch goes through [`InboundTopic::route`], a fixed table from topic
//! to the action the message handler takes, instead of comparing strings at
//! each call site.

use super::reading::ReadingField;

// =============================================================================
// Inbound Topics
// =============================================================================

/// A topic the relay subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundTopic {
    /// `sensors/temperature`
    Temperature,
    /// `sensors/humidity`
    Humidity,
    /// `sensors/ldr`
    Ldr,
    /// `sensors/fan`
    Fan,
    /// `sensors/light`
    Light,
    /// `fan_usage_percentage`
    FanUsage,
    /// `light_usage_percentage`
    LightUsage,
    /// `Alert_temp`
    AlertTemp,
    /// `Alert_humidity`
    AlertHumidity,
    /// `Alert_darkness`
    AlertDarkness,
}

impl InboundTopic {
    /// All inbound topics, in subscription order.
    pub const ALL: [Self; 10] = [
        Self::Temperature,
        Self::Humidity,
        Self::Ldr,
        Self::Fan,
        Self::Light,
        Self::AlertTemp,
        Self::AlertHumidity,
        Self::AlertDarkness,
        Self::FanUsage,
        Self::LightUsage,
    ];

    /// Resolve a broker topic string. Matching is exact and case-sensitive.
    #[must_use]
    pub fn parse(topic: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == topic)
    }

    /// The broker topic string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "sensors/temperature",
            Self::Humidity => "sensors/humidity",
            Self::Ldr => "sensors/ldr",
            Self::Fan => "sensors/fan",
            Self::Light => "sensors/light",
            Self::FanUsage => "fan_usage_percentage",
            Self::LightUsage => "light_usage_percentage",
            Self::AlertTemp => "Alert_temp",
            Self::AlertHumidity => "Alert_humidity",
            Self::AlertDarkness => "Alert_darkness",
        }
    }

    /// The subscription group this topic belongs to.
    #[must_use]
    pub const fn group(self) -> TopicGroup {
        match self {
            Self::Temperature | Self::Humidity | Self::Ldr | Self::Fan | Self::Light => {
                TopicGroup::Sensors
            }
            Self::AlertTemp | Self::AlertHumidity | Self::AlertDarkness => TopicGroup::Alerts,
            Self::FanUsage | Self::LightUsage => TopicGroup::Usage,
        }
    }

    /// What the message handler does with a message on this topic.
    #[must_use]
    pub const fn route(self) -> Route {
        match self {
            Self::Temperature => Route::Reading {
                field: ReadingField::Temperature,
                push: None,
            },
            Self::Humidity => Route::Reading {
                field: ReadingField::Humidity,
                push: None,
            },
            Self::Ldr => Route::Reading {
                field: ReadingField::Darkness,
                push: None,
            },
            Self::Fan => Route::Reading {
                field: ReadingField::FanStatus,
                push: Some(StatusEvent::Fan),
            },
            Self::Light => Route::Reading {
                field: ReadingField::LightStatus,
                push: Some(StatusEvent::Light),
            },
            Self::FanUsage => Route::Reading {
                field: ReadingField::FanUsagePercentage,
                push: None,
            },
            Self::LightUsage => Route::Reading {
                field: ReadingField::LightUsagePercentage,
                push: None,
            },
            Self::AlertTemp => Route::Alert {
                sensor: ReadingField::Temperature,
            },
            Self::AlertHumidity => Route::Alert {
                sensor: ReadingField::Humidity,
            },
            Self::AlertDarkness => Route::Alert {
                sensor: ReadingField::Darkness,
            },
        }
    }
}

impl std::fmt::Display for InboundTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Routing
// =============================================================================

/// Status change events pushed to live clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// `fan_status`
    Fan,
    /// `light_status`
    Light,
}

/// Handler action for an inbound topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Overwrite a reading, optionally pushing a status event afterwards.
    Reading {
        /// Field to overwrite.
        field: ReadingField,
        /// Status event to push with the new value.
        push: Option<StatusEvent>,
    },
    /// Evaluate an alert; `sensor` supplies the triggering value.
    Alert {
        /// Reading whose current value goes into the alert record.
        sensor: ReadingField,
    },
}

// =============================================================================
// Subscription Groups
// =============================================================================

/// The three topic groups subscribed on every connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicGroup {
    /// Sensor readings and device status.
    Sensors,
    /// Alert triggers.
    Alerts,
    /// Device usage percentages.
    Usage,
}

impl TopicGroup {
    /// All groups, in subscription order.
    pub const ALL: [Self; 3] = [Self::Sensors, Self::Alerts, Self::Usage];

    /// Topics in this group.
    #[must_use]
    pub fn topics(self) -> Vec<InboundTopic> {
        InboundTopic::ALL
            .into_iter()
            .filter(|t| t.group() == self)
            .collect()
    }

    /// Group name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sensors => "sensors",
            Self::Alerts => "alerts",
            Self::Usage => "usage",
        }
    }
}
