//! The fixed catalog of components users can generate code for.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use ts_rs::TS;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    TS,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum Component {
    #[default]
    #[strum(serialize = "LED")]
    #[serde(rename = "LED")]
    Led,
    #[strum(serialize = "Push Button")]
    #[serde(rename = "Push Button")]
    PushButton,
    #[strum(serialize = "Servo Motor")]
    #[serde(rename = "Servo Motor")]
    ServoMotor,
    #[strum(serialize = "DHT11 Sensor")]
    #[serde(rename = "DHT11 Sensor")]
    Dht11Sensor,
    #[strum(serialize = "HC-SR04 Ultrasonic Sensor")]
    #[serde(rename = "HC-SR04 Ultrasonic Sensor")]
    UltrasonicSensor,
    #[strum(serialize = "PIR Motion Sensor")]
    #[serde(rename = "PIR Motion Sensor")]
    PirMotionSensor,
    #[strum(serialize = "LDR (Photoresistor)")]
    #[serde(rename = "LDR (Photoresistor)")]
    Photoresistor,
    #[strum(serialize = "Buzzer")]
    #[serde(rename = "Buzzer")]
    Buzzer,
    #[strum(serialize = "Relay Module")]
    #[serde(rename = "Relay Module")]
    RelayModule,
    #[strum(serialize = "16x2 LCD (I2C)")]
    #[serde(rename = "16x2 LCD (I2C)")]
    Lcd16x2,
    #[strum(serialize = "Potentiometer")]
    #[serde(rename = "Potentiometer")]
    Potentiometer,
    #[strum(serialize = "DC Motor (L298N)")]
    #[serde(rename = "DC Motor (L298N)")]
    DcMotor,
    #[strum(serialize = "Stepper Motor")]
    #[serde(rename = "Stepper Motor")]
    StepperMotor,
    #[strum(serialize = "RGB LED")]
    #[serde(rename = "RGB LED")]
    RgbLed,
    #[strum(serialize = "Soil Moisture Sensor")]
    #[serde(rename = "Soil Moisture Sensor")]
    SoilMoistureSensor,
}

impl Component {
    pub fn all() -> Vec<Component> {
        Component::iter().collect()
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<Component> {
        let wanted = name.trim();
        Component::iter().find(|c| c.name().eq_ignore_ascii_case(wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_entry_is_the_default() {
        assert_eq!(Component::all()[0], Component::default());
        assert_eq!(Component::default().name(), "LED");
    }

    #[test]
    fn names_round_trip_through_lookup() {
        for component in Component::all() {
            assert_eq!(Component::from_name(component.name()), Some(component));
        }
    }

    #[test]
    fn lookup_ignores_case_and_padding() {
        assert_eq!(Component::from_name("  servo motor "), Some(Component::ServoMotor));
        assert_eq!(Component::from_name("flux capacitor"), None);
    }

    #[test]
    fn serializes_as_display_name() {
        let json = serde_json::to_string(&Component::Dht11Sensor).unwrap();
        assert_eq!(json, "\"DHT11 Sensor\"");
    }
}
