//! The register map: names, addresses, access modes, and bit fields.
//!
//! The directory is plain data. Build one with [RegisterDirectory::um7]
//! and share it between clients with an [std::sync::Arc].

use std::collections::HashMap;

use crate::protocol::{EULER_SCALE, QUATERNION_SCALE};
use crate::ProtocolError;

/// Main and hidden registers live in separate address spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegisterSpace {
    Main,
    Hidden,
}

impl RegisterSpace {
    pub fn from_hidden(hidden: bool) -> Self {
        if hidden {
            Self::Hidden
        } else {
            Self::Main
        }
    }

    pub fn is_hidden(&self) -> bool {
        *self == Self::Hidden
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub fn can_read(&self) -> bool {
        !matches!(self, Self::WriteOnly)
    }

    pub fn can_write(&self) -> bool {
        !matches!(self, Self::ReadOnly)
    }
}

impl core::fmt::Display for Access {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(match self {
            Self::ReadOnly => "read-only",
            Self::WriteOnly => "write-only",
            Self::ReadWrite => "read-write",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegisterKind {
    /// Configuration, persisted with FLASH_COMMIT.
    Config,
    /// Measurements and estimates.
    Data,
    /// Writing (or, for GET_FW_REVISION, reading) triggers an action.
    Command,
}

/// How the bits of a field are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataType {
    BitField,
    U8,
    I16,
    F32,
    /// Four ASCII characters.
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnumValue {
    pub name: &'static str,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Field {
    pub name: &'static str,
    pub msb: u8,
    pub lsb: u8,
    pub data_type: DataType,
    /// Raw values are divided by this, if present.
    pub scale: Option<f32>,
    pub values: &'static [EnumValue],
    pub description: &'static str,
}

/// A decoded field.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum FieldValue {
    Bool(bool),
    Unsigned(u32),
    Signed(i32),
    Float(f32),
    Enum(EnumValue),
    Text(String),
}

impl core::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Unsigned(v) => write!(f, "{}", v),
            Self::Signed(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Enum(e) => write!(f, "{} ({})", e.name, e.value),
            Self::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl Field {
    const fn new(name: &'static str, msb: u8, lsb: u8, data_type: DataType) -> Self {
        Self {
            name,
            msb,
            lsb,
            data_type,
            scale: None,
            values: &[],
            description: "",
        }
    }

    const fn bit(name: &'static str, bit: u8, description: &'static str) -> Self {
        Self::new(name, bit, bit, DataType::BitField).describe(description)
    }

    const fn bits(name: &'static str, msb: u8, lsb: u8, description: &'static str) -> Self {
        Self::new(name, msb, lsb, DataType::BitField).describe(description)
    }

    const fn rate(name: &'static str, msb: u8, description: &'static str) -> Self {
        Self::new(name, msb, msb - 7, DataType::U8).describe(description)
    }

    const fn int16(name: &'static str, msb: u8, description: &'static str) -> Self {
        Self::new(name, msb, msb - 15, DataType::I16).describe(description)
    }

    const fn scaled(self, scale: f32) -> Self {
        Self {
            scale: Some(scale),
            ..self
        }
    }

    const fn enumerated(self, values: &'static [EnumValue]) -> Self {
        Self { values, ..self }
    }

    const fn describe(self, description: &'static str) -> Self {
        Self {
            description,
            ..self
        }
    }

    pub fn width(&self) -> u32 {
        (self.msb - self.lsb) as u32 + 1
    }

    pub fn mask(&self) -> u32 {
        if self.width() >= 32 {
            u32::MAX
        } else {
            (1 << self.width()) - 1
        }
    }

    /// The raw bits of this field, shifted down.
    pub fn extract(&self, word: u32) -> u32 {
        (word >> self.lsb) & self.mask()
    }

    pub fn decode(&self, word: u32) -> FieldValue {
        let raw = self.extract(word);

        if let Some(e) = self.values.iter().find(|e| e.value == raw) {
            return FieldValue::Enum(*e);
        }

        match self.data_type {
            DataType::BitField if self.width() == 1 => FieldValue::Bool(raw != 0),
            DataType::BitField | DataType::U8 => match self.scale {
                Some(scale) => FieldValue::Float(raw as f32 / scale),
                None => FieldValue::Unsigned(raw),
            },
            DataType::I16 => {
                let signed = raw as u16 as i16;
                match self.scale {
                    Some(scale) => FieldValue::Float(signed as f32 / scale),
                    None => FieldValue::Signed(signed as i32),
                }
            }
            DataType::F32 => FieldValue::Float(f32::from_bits(raw)),
            DataType::String => {
                let text = raw.to_be_bytes().iter().map(|b| *b as char).collect();
                FieldValue::Text(text)
            }
        }
    }

    /// Replace this field's bits inside a register word.
    pub fn insert(&self, word: u32, raw: u32) -> Result<u32, ProtocolError> {
        if raw & !self.mask() != 0 {
            return Err(ProtocolError::InvalidArgument("value does not fit in field"));
        }
        Ok((word & !(self.mask() << self.lsb)) | (raw << self.lsb))
    }

    /// Look up an enumerated value by name.
    pub fn value_of(&self, name: &str) -> Option<u32> {
        self.values
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RegisterDescriptor {
    pub name: &'static str,
    pub address: u8,
    pub space: RegisterSpace,
    pub access: Access,
    pub kind: RegisterKind,
    /// Interpretation of the whole word, when there are no fields.
    pub data_type: DataType,
    pub description: &'static str,
    pub fields: &'static [Field],
}

impl RegisterDescriptor {
    const fn new(name: &'static str, address: u8, kind: RegisterKind, access: Access) -> Self {
        Self {
            name,
            address,
            space: RegisterSpace::Main,
            access,
            kind,
            data_type: DataType::F32,
            description: "",
            fields: &[],
        }
    }

    const fn config(name: &'static str, address: u8, description: &'static str) -> Self {
        Self::new(name, address, RegisterKind::Config, Access::ReadWrite).describe(description)
    }

    const fn data(name: &'static str, address: u8, description: &'static str) -> Self {
        Self::new(name, address, RegisterKind::Data, Access::ReadOnly).describe(description)
    }

    const fn command(name: &'static str, address: u8, description: &'static str) -> Self {
        Self::new(name, address, RegisterKind::Command, Access::WriteOnly).describe(description)
    }

    const fn hidden(name: &'static str, address: u8, description: &'static str) -> Self {
        Self {
            space: RegisterSpace::Hidden,
            ..Self::config(name, address, description)
        }
    }

    const fn describe(self, description: &'static str) -> Self {
        Self {
            description,
            ..self
        }
    }

    const fn with_fields(self, fields: &'static [Field]) -> Self {
        Self {
            data_type: DataType::BitField,
            fields,
            ..self
        }
    }

    const fn typed(self, data_type: DataType) -> Self {
        Self { data_type, ..self }
    }

    const fn access(self, access: Access) -> Self {
        Self { access, ..self }
    }

    pub fn is_hidden(&self) -> bool {
        self.space.is_hidden()
    }

    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// The whole word, as a field, for registers without any.
    pub fn whole(&self) -> Field {
        Field::new(self.name, 31, 0, self.data_type).describe(self.description)
    }

    /// Decode every field of a register value.
    pub fn decode(&self, word: u32) -> Vec<(&'static str, FieldValue)> {
        if self.fields.is_empty() {
            return vec![(self.name, self.whole().decode(word))];
        }
        self.fields.iter().map(|f| (f.name, f.decode(word))).collect()
    }

    pub fn decode_bytes(&self, payload: [u8; 4]) -> Vec<(&'static str, FieldValue)> {
        self.decode(u32::from_be_bytes(payload))
    }
}

const fn ev(name: &'static str, value: u32) -> EnumValue {
    EnumValue { name, value }
}

const BAUD_RATES: &[EnumValue] = &[
    ev("9600", 0),
    ev("14400", 1),
    ev("19200", 2),
    ev("38400", 3),
    ev("57600", 4),
    ev("115200", 5),
    ev("128000", 6),
    ev("153600", 7),
    ev("230400", 8),
    ev("256000", 9),
    ev("460800", 10),
    ev("921600", 11),
];

/// Map a baud rate to its COM_SETTINGS encoding.
pub fn baud_rate_code(baud: u32) -> Option<u32> {
    let name = baud.to_string();
    BAUD_RATES.iter().find(|e| e.name == name).map(|e| e.value)
}

const HEALTH_RATES: &[EnumValue] = &[
    ev("OFF", 0),
    ev("0.125Hz", 1),
    ev("0.25Hz", 2),
    ev("0.5Hz", 3),
    ev("1Hz", 4),
    ev("2Hz", 5),
    ev("4Hz", 6),
];

const NMEA_RATES: &[EnumValue] = &[
    ev("OFF", 0),
    ev("1Hz", 1),
    ev("2Hz", 2),
    ev("4Hz", 3),
    ev("5Hz", 4),
    ev("10Hz", 5),
    ev("15Hz", 6),
    ev("20Hz", 7),
    ev("30Hz", 8),
    ev("40Hz", 9),
    ev("50Hz", 10),
    ev("60Hz", 11),
    ev("70Hz", 12),
    ev("80Hz", 13),
    ev("90Hz", 14),
    ev("100Hz", 15),
];

const COM_SETTINGS: &[Field] = &[
    Field::bits("BAUD_RATE", 31, 28, "Main serial port baud rate").enumerated(BAUD_RATES),
    Field::bits("GPS_BAUD", 27, 24, "Auxiliary serial port baud rate").enumerated(BAUD_RATES),
    Field::bit("GPS", 8, "Broadcast GPS data when it arrives"),
    Field::bit("SAT", 4, "Broadcast satellite details when they arrive"),
];

const COM_RATES1: &[Field] = &[
    Field::rate("RAW_ACCEL_RATE", 31, "Raw accelerometer broadcast rate in Hz"),
    Field::rate("RAW_GYRO_RATE", 23, "Raw gyro broadcast rate in Hz"),
    Field::rate("RAW_MAG_RATE", 15, "Raw magnetometer broadcast rate in Hz"),
];

const COM_RATES2: &[Field] = &[
    Field::rate("TEMP_RATE", 31, "Temperature broadcast rate in Hz"),
    Field::rate("ALL_RAW_RATE", 7, "All raw data broadcast rate in Hz"),
];

const COM_RATES3: &[Field] = &[
    Field::rate("PROC_ACCEL_RATE", 31, "Processed accelerometer broadcast rate in Hz"),
    Field::rate("PROC_GYRO_RATE", 23, "Processed gyro broadcast rate in Hz"),
    Field::rate("PROC_MAG_RATE", 15, "Processed magnetometer broadcast rate in Hz"),
];

const COM_RATES4: &[Field] = &[Field::rate(
    "ALL_PROC_RATE",
    7,
    "All processed data broadcast rate in Hz",
)];

const COM_RATES5: &[Field] = &[
    Field::rate("QUAT_RATE", 31, "Quaternion broadcast rate in Hz"),
    Field::rate("EULER_RATE", 23, "Euler angle broadcast rate in Hz"),
    Field::rate("POSITION_RATE", 15, "Position broadcast rate in Hz"),
    Field::rate("VELOCITY_RATE", 7, "Velocity broadcast rate in Hz"),
];

const COM_RATES6: &[Field] = &[
    Field::rate("POSE_RATE", 31, "Pose broadcast rate in Hz"),
    Field::bits("HEALTH_RATE", 19, 16, "Health packet broadcast rate").enumerated(HEALTH_RATES),
    Field::rate("GYRO_BIAS_RATE", 15, "Gyro bias broadcast rate in Hz"),
];

const COM_RATES7: &[Field] = &[
    Field::bits("NMEA_HEALTH_RATE", 31, 28, "NMEA health packet rate").enumerated(NMEA_RATES),
    Field::bits("NMEA_POSE_RATE", 27, 24, "NMEA pose packet rate").enumerated(NMEA_RATES),
    Field::bits("NMEA_ATTITUDE_RATE", 23, 20, "NMEA attitude packet rate").enumerated(NMEA_RATES),
    Field::bits("NMEA_SENSOR_RATE", 19, 16, "NMEA sensor packet rate").enumerated(NMEA_RATES),
    Field::bits("NMEA_RATES_RATE", 15, 12, "NMEA rates packet rate").enumerated(NMEA_RATES),
    Field::bits("NMEA_GPS_POSE_RATE", 11, 8, "NMEA GPS pose packet rate").enumerated(NMEA_RATES),
    Field::bits("NMEA_QUAT_RATE", 7, 4, "NMEA quaternion packet rate").enumerated(NMEA_RATES),
];

const MISC_SETTINGS: &[Field] = &[
    Field::bit("PPS", 8, "Use TX2 as a PPS input"),
    Field::bit("ZG", 2, "Measure gyro bias on startup"),
    Field::bit("Q", 1, "Run in quaternion mode"),
    Field::bit("MAG", 0, "Use the magnetometer in state updates"),
];

const HEALTH: &[Field] = &[
    Field::bits("SATS_USED", 31, 26, "Satellites used in the position solution"),
    Field::bits("HDOP", 25, 16, "Horizontal dilution of precision"),
    Field::bits("SATS_IN_VIEW", 15, 10, "Satellites in view"),
    Field::bit("OVF", 8, "Broadcast data overflowed the serial link"),
    Field::bit("MG_N", 5, "Magnetometer norm out of range"),
    Field::bit("ACC_N", 4, "Accelerometer norm out of range"),
    Field::bit("ACCEL", 3, "Accelerometer failed to initialize"),
    Field::bit("GYRO", 2, "Gyro failed to initialize"),
    Field::bit("MAG", 1, "Magnetometer failed to initialize"),
    Field::bit("GPS", 0, "No GPS packet for two seconds"),
];

const GYRO_RAW_XY: &[Field] = &[
    Field::int16("GYRO_RAW_X", 31, "Gyro X"),
    Field::int16("GYRO_RAW_Y", 15, "Gyro Y"),
];
const GYRO_RAW_Z: &[Field] = &[Field::int16("GYRO_RAW_Z", 31, "Gyro Z")];
const ACCEL_RAW_XY: &[Field] = &[
    Field::int16("ACCEL_RAW_X", 31, "Accel X"),
    Field::int16("ACCEL_RAW_Y", 15, "Accel Y"),
];
const ACCEL_RAW_Z: &[Field] = &[Field::int16("ACCEL_RAW_Z", 31, "Accel Z")];
const MAG_RAW_XY: &[Field] = &[
    Field::int16("MAG_RAW_X", 31, "Magnetometer X"),
    Field::int16("MAG_RAW_Y", 15, "Magnetometer Y"),
];
const MAG_RAW_Z: &[Field] = &[Field::int16("MAG_RAW_Z", 31, "Magnetometer Z")];

const QUAT_AB: &[Field] = &[
    Field::int16("QUAT_A", 31, "First quaternion component").scaled(QUATERNION_SCALE),
    Field::int16("QUAT_B", 15, "Second quaternion component").scaled(QUATERNION_SCALE),
];
const QUAT_CD: &[Field] = &[
    Field::int16("QUAT_C", 31, "Third quaternion component").scaled(QUATERNION_SCALE),
    Field::int16("QUAT_D", 15, "Fourth quaternion component").scaled(QUATERNION_SCALE),
];

const EULER_PHI_THETA: &[Field] = &[
    Field::int16("PHI", 31, "Roll angle in degrees").scaled(EULER_SCALE),
    Field::int16("THETA", 15, "Pitch angle in degrees").scaled(EULER_SCALE),
];
const EULER_PSI: &[Field] = &[Field::int16("PSI", 31, "Yaw angle in degrees").scaled(EULER_SCALE)];
const EULER_PHI_THETA_DOT: &[Field] = &[
    Field::int16("PHI_DOT", 31, "Roll rate").scaled(EULER_SCALE),
    Field::int16("THETA_DOT", 15, "Pitch rate").scaled(EULER_SCALE),
];
const EULER_PSI_DOT: &[Field] = &[Field::int16("PSI_DOT", 31, "Yaw rate").scaled(EULER_SCALE)];

macro_rules! satellite_pair {
    ($name:ident, $a_id:literal, $a_snr:literal, $b_id:literal, $b_snr:literal) => {
        const $name: &[Field] = &[
            Field::new($a_id, 31, 24, DataType::U8),
            Field::new($a_snr, 23, 16, DataType::U8),
            Field::new($b_id, 15, 8, DataType::U8),
            Field::new($b_snr, 7, 0, DataType::U8),
        ];
    };
}

satellite_pair!(GPS_SAT_1_2, "SAT_1_ID", "SAT_1_SNR", "SAT_2_ID", "SAT_2_SNR");
satellite_pair!(GPS_SAT_3_4, "SAT_3_ID", "SAT_3_SNR", "SAT_4_ID", "SAT_4_SNR");
satellite_pair!(GPS_SAT_5_6, "SAT_5_ID", "SAT_5_SNR", "SAT_6_ID", "SAT_6_SNR");
satellite_pair!(GPS_SAT_7_8, "SAT_7_ID", "SAT_7_SNR", "SAT_8_ID", "SAT_8_SNR");
satellite_pair!(GPS_SAT_9_10, "SAT_9_ID", "SAT_9_SNR", "SAT_10_ID", "SAT_10_SNR");
satellite_pair!(GPS_SAT_11_12, "SAT_11_ID", "SAT_11_SNR", "SAT_12_ID", "SAT_12_SNR");

type R = RegisterDescriptor;

/// Every register on the UM7.
pub static UM7_REGISTERS: &[RegisterDescriptor] = &[
    R::config("CREG_COM_SETTINGS", 0x00, "Serial port settings").with_fields(COM_SETTINGS),
    R::config("CREG_COM_RATES1", 0x01, "Raw sensor broadcast rates").with_fields(COM_RATES1),
    R::config("CREG_COM_RATES2", 0x02, "Temperature and all raw broadcast rates").with_fields(COM_RATES2),
    R::config("CREG_COM_RATES3", 0x03, "Processed sensor broadcast rates").with_fields(COM_RATES3),
    R::config("CREG_COM_RATES4", 0x04, "All processed broadcast rate").with_fields(COM_RATES4),
    R::config("CREG_COM_RATES5", 0x05, "Attitude and position broadcast rates").with_fields(COM_RATES5),
    R::config("CREG_COM_RATES6", 0x06, "Pose, health, and gyro bias broadcast rates").with_fields(COM_RATES6),
    R::config("CREG_COM_RATES7", 0x07, "NMEA packet broadcast rates").with_fields(COM_RATES7),
    R::config("CREG_MISC_SETTINGS", 0x08, "Filter settings").with_fields(MISC_SETTINGS),
    R::config("CREG_HOME_NORTH", 0x09, "Home north position"),
    R::config("CREG_HOME_EAST", 0x0a, "Home east position"),
    R::config("CREG_HOME_UP", 0x0b, "Home altitude"),
    R::config("CREG_GYRO_TRIM_X", 0x0c, "Gyro X trim"),
    R::config("CREG_GYRO_TRIM_Y", 0x0d, "Gyro Y trim"),
    R::config("CREG_GYRO_TRIM_Z", 0x0e, "Gyro Z trim"),
    R::config("CREG_MAG_CAL1_1", 0x0f, "Magnetometer calibration matrix, row 1 column 1"),
    R::config("CREG_MAG_CAL1_2", 0x10, "Magnetometer calibration matrix, row 1 column 2"),
    R::config("CREG_MAG_CAL1_3", 0x11, "Magnetometer calibration matrix, row 1 column 3"),
    R::config("CREG_MAG_CAL2_1", 0x12, "Magnetometer calibration matrix, row 2 column 1"),
    R::config("CREG_MAG_CAL2_2", 0x13, "Magnetometer calibration matrix, row 2 column 2"),
    R::config("CREG_MAG_CAL2_3", 0x14, "Magnetometer calibration matrix, row 2 column 3"),
    R::config("CREG_MAG_CAL3_1", 0x15, "Magnetometer calibration matrix, row 3 column 1"),
    R::config("CREG_MAG_CAL3_2", 0x16, "Magnetometer calibration matrix, row 3 column 2"),
    R::config("CREG_MAG_CAL3_3", 0x17, "Magnetometer calibration matrix, row 3 column 3"),
    R::config("CREG_MAG_BIAS_X", 0x18, "Magnetometer X bias"),
    R::config("CREG_MAG_BIAS_Y", 0x19, "Magnetometer Y bias"),
    R::config("CREG_MAG_BIAS_Z", 0x1a, "Magnetometer Z bias"),
    R::config("CREG_ACCEL_CAL1_1", 0x1b, "Accelerometer calibration matrix, row 1 column 1"),
    R::config("CREG_ACCEL_CAL1_2", 0x1c, "Accelerometer calibration matrix, row 1 column 2"),
    R::config("CREG_ACCEL_CAL1_3", 0x1d, "Accelerometer calibration matrix, row 1 column 3"),
    R::config("CREG_ACCEL_CAL2_1", 0x1e, "Accelerometer calibration matrix, row 2 column 1"),
    R::config("CREG_ACCEL_CAL2_2", 0x1f, "Accelerometer calibration matrix, row 2 column 2"),
    R::config("CREG_ACCEL_CAL2_3", 0x20, "Accelerometer calibration matrix, row 2 column 3"),
    R::config("CREG_ACCEL_CAL3_1", 0x21, "Accelerometer calibration matrix, row 3 column 1"),
    R::config("CREG_ACCEL_CAL3_2", 0x22, "Accelerometer calibration matrix, row 3 column 2"),
    R::config("CREG_ACCEL_CAL3_3", 0x23, "Accelerometer calibration matrix, row 3 column 3"),
    R::config("CREG_ACCEL_BIAS_X", 0x24, "Accelerometer X bias"),
    R::config("CREG_ACCEL_BIAS_Y", 0x25, "Accelerometer Y bias"),
    R::config("CREG_ACCEL_BIAS_Z", 0x26, "Accelerometer Z bias"),
    R::data("DREG_HEALTH", 0x55, "Sensor health").with_fields(HEALTH),
    R::data("DREG_GYRO_RAW_XY", 0x56, "Raw gyro X and Y").with_fields(GYRO_RAW_XY),
    R::data("DREG_GYRO_RAW_Z", 0x57, "Raw gyro Z").with_fields(GYRO_RAW_Z),
    R::data("DREG_GYRO_RAW_TIME", 0x58, "Raw gyro time"),
    R::data("DREG_ACCEL_RAW_XY", 0x59, "Raw accelerometer X and Y").with_fields(ACCEL_RAW_XY),
    R::data("DREG_ACCEL_RAW_Z", 0x5a, "Raw accelerometer Z").with_fields(ACCEL_RAW_Z),
    R::data("DREG_ACCEL_RAW_TIME", 0x5b, "Raw accelerometer time"),
    R::data("DREG_MAG_RAW_XY", 0x5c, "Raw magnetometer X and Y").with_fields(MAG_RAW_XY),
    R::data("DREG_MAG_RAW_Z", 0x5d, "Raw magnetometer Z").with_fields(MAG_RAW_Z),
    R::data("DREG_MAG_RAW_TIME", 0x5e, "Raw magnetometer time"),
    R::data("DREG_TEMPERATURE", 0x5f, "Temperature in degrees Celsius"),
    R::data("DREG_TEMPERATURE_TIME", 0x60, "Temperature time"),
    R::data("DREG_GYRO_PROC_X", 0x61, "Gyro X in degrees per second"),
    R::data("DREG_GYRO_PROC_Y", 0x62, "Gyro Y in degrees per second"),
    R::data("DREG_GYRO_PROC_Z", 0x63, "Gyro Z in degrees per second"),
    R::data("DREG_GYRO_PROC_TIME", 0x64, "Processed gyro time"),
    R::data("DREG_ACCEL_PROC_X", 0x65, "Acceleration X"),
    R::data("DREG_ACCEL_PROC_Y", 0x66, "Acceleration Y"),
    R::data("DREG_ACCEL_PROC_Z", 0x67, "Acceleration Z"),
    R::data("DREG_ACCEL_PROC_TIME", 0x68, "Processed accelerometer time"),
    R::data("DREG_MAG_PROC_X", 0x69, "Magnetometer X"),
    R::data("DREG_MAG_PROC_Y", 0x6a, "Magnetometer Y"),
    R::data("DREG_MAG_PROC_Z", 0x6b, "Magnetometer Z"),
    R::data("DREG_MAG_PROC_TIME", 0x6c, "Processed magnetometer time"),
    R::data("DREG_QUAT_AB", 0x6d, "Quaternion A and B").with_fields(QUAT_AB),
    R::data("DREG_QUAT_CD", 0x6e, "Quaternion C and D").with_fields(QUAT_CD),
    R::data("DREG_QUAT_TIME", 0x6f, "Quaternion time"),
    R::data("DREG_EULER_PHI_THETA", 0x70, "Roll and pitch").with_fields(EULER_PHI_THETA),
    R::data("DREG_EULER_PSI", 0x71, "Yaw").with_fields(EULER_PSI),
    R::data("DREG_EULER_PHI_THETA_DOT", 0x72, "Roll and pitch rates").with_fields(EULER_PHI_THETA_DOT),
    R::data("DREG_EULER_PSI_DOT", 0x73, "Yaw rate").with_fields(EULER_PSI_DOT),
    R::data("DREG_EULER_TIME", 0x74, "Euler time"),
    R::data("DREG_POSITION_NORTH", 0x75, "North position"),
    R::data("DREG_POSITION_EAST", 0x76, "East position"),
    R::data("DREG_POSITION_UP", 0x77, "Altitude"),
    R::data("DREG_POSITION_TIME", 0x78, "Position time"),
    R::data("DREG_VELOCITY_NORTH", 0x79, "North velocity"),
    R::data("DREG_VELOCITY_EAST", 0x7a, "East velocity"),
    R::data("DREG_VELOCITY_UP", 0x7b, "Vertical velocity"),
    R::data("DREG_VELOCITY_TIME", 0x7c, "Velocity time"),
    R::data("DREG_GPS_LATITUDE", 0x7d, "GPS latitude"),
    R::data("DREG_GPS_LONGITUDE", 0x7e, "GPS longitude"),
    R::data("DREG_GPS_ALTITUDE", 0x7f, "GPS altitude"),
    R::data("DREG_GPS_COURSE", 0x80, "GPS course"),
    R::data("DREG_GPS_SPEED", 0x81, "GPS speed"),
    R::data("DREG_GPS_TIME", 0x82, "GPS time"),
    R::data("DREG_GPS_SAT_1_2", 0x83, "Satellites 1 and 2").with_fields(GPS_SAT_1_2),
    R::data("DREG_GPS_SAT_3_4", 0x84, "Satellites 3 and 4").with_fields(GPS_SAT_3_4),
    R::data("DREG_GPS_SAT_5_6", 0x85, "Satellites 5 and 6").with_fields(GPS_SAT_5_6),
    R::data("DREG_GPS_SAT_7_8", 0x86, "Satellites 7 and 8").with_fields(GPS_SAT_7_8),
    R::data("DREG_GPS_SAT_9_10", 0x87, "Satellites 9 and 10").with_fields(GPS_SAT_9_10),
    R::data("DREG_GPS_SAT_11_12", 0x88, "Satellites 11 and 12").with_fields(GPS_SAT_11_12),
    R::data("DREG_GYRO_BIAS_X", 0x89, "Gyro X bias"),
    R::data("DREG_GYRO_BIAS_Y", 0x8a, "Gyro Y bias"),
    R::data("DREG_GYRO_BIAS_Z", 0x8b, "Gyro Z bias"),
    R::command("GET_FW_REVISION", 0xaa, "Four character firmware revision")
        .typed(DataType::String)
        .access(Access::ReadOnly),
    R::command("FLASH_COMMIT", 0xab, "Write configuration to flash"),
    R::command("RESET_TO_FACTORY", 0xac, "Restore factory configuration"),
    R::command("ZERO_GYROS", 0xad, "Measure gyro bias, sensor must be stationary"),
    R::command("SET_HOME_POSITION", 0xae, "Use the current GPS position as home"),
    R::command("SET_MAG_REFERENCE", 0xb0, "Use the current magnetometer reading as reference"),
    R::command("CALIBRATE_ACCELEROMETERS", 0xb1, "Calibrate the accelerometers"),
    R::command("RESET_EKF", 0xb3, "Reset the Kalman filter"),
    R::hidden("HIDDEN_GYRO_VARIANCE", 0x00, "Gyro variance for the EKF"),
    R::hidden("HIDDEN_ACCEL_VARIANCE", 0x01, "Accelerometer variance for the EKF"),
];

/// Lookup of register descriptors by name or address.
#[derive(Debug, Clone)]
pub struct RegisterDirectory {
    registers: &'static [RegisterDescriptor],
    by_name: HashMap<String, usize>,
    by_address: HashMap<(RegisterSpace, u8), usize>,
}

impl RegisterDirectory {
    pub fn new(registers: &'static [RegisterDescriptor]) -> Self {
        let mut by_name = HashMap::with_capacity(registers.len());
        let mut by_address = HashMap::with_capacity(registers.len());
        for (i, reg) in registers.iter().enumerate() {
            by_name.insert(reg.name.to_ascii_uppercase(), i);
            by_address.insert((reg.space, reg.address), i);
        }

        Self {
            registers,
            by_name,
            by_address,
        }
    }

    /// The directory for the UM7.
    pub fn um7() -> Self {
        Self::new(UM7_REGISTERS)
    }

    /// Find a register by name, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<&'static RegisterDescriptor> {
        let i = *self.by_name.get(&name.to_ascii_uppercase())?;
        Some(&self.registers[i])
    }

    pub fn lookup_address(
        &self,
        space: RegisterSpace,
        address: u8,
    ) -> Option<&'static RegisterDescriptor> {
        let i = *self.by_address.get(&(space, address))?;
        Some(&self.registers[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static RegisterDescriptor> {
        self.registers.iter()
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

impl Default for RegisterDirectory {
    fn default() -> Self {
        Self::um7()
    }
}
