//! Broadcast telemetry packets, identified by start address and frame length.

use nom::bytes::complete::take;
use nom::number::complete::{be_f32, be_i16, be_u32, u8 as be_u8};
use nom::IResult;

use crate::ProtocolError;

use super::{extract_payload, Frame};

/// Raw Euler angle and rate units per degree (per degree per second).
pub const EULER_SCALE: f32 = 91.02222;

/// Raw quaternion units per unit quaternion component.
pub const QUATERNION_SCALE: f32 = 29789.09091;

/// Every broadcast shape the decoder knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BroadcastKind {
    Health,
    AllRaw,
    RawGyro,
    RawAccel,
    RawMag,
    Temperature,
    AllProc,
    ProcGyro,
    ProcAccel,
    ProcMag,
    Quaternion,
    Euler,
    Pose,
    Position,
    Velocity,
    Gps,
    Satellites,
    GyroBias,
}

impl BroadcastKind {
    pub const ALL: [BroadcastKind; 18] = [
        Self::Health,
        Self::AllRaw,
        Self::RawGyro,
        Self::RawAccel,
        Self::RawMag,
        Self::Temperature,
        Self::AllProc,
        Self::ProcGyro,
        Self::ProcAccel,
        Self::ProcMag,
        Self::Quaternion,
        Self::Euler,
        Self::Pose,
        Self::Position,
        Self::Velocity,
        Self::Gps,
        Self::Satellites,
        Self::GyroBias,
    ];

    /// Address of the first register in the packet.
    pub fn address(&self) -> u8 {
        match self {
            Self::Health => 0x55,
            Self::AllRaw | Self::RawGyro => 0x56,
            Self::RawAccel => 0x59,
            Self::RawMag => 0x5c,
            Self::Temperature => 0x5f,
            Self::AllProc | Self::ProcGyro => 0x61,
            Self::ProcAccel => 0x65,
            Self::ProcMag => 0x69,
            Self::Quaternion => 0x6d,
            Self::Euler | Self::Pose => 0x70,
            Self::Position => 0x75,
            Self::Velocity => 0x79,
            Self::Gps => 0x7d,
            Self::Satellites => 0x83,
            Self::GyroBias => 0x89,
        }
    }

    /// Total frame length, preamble to checksum.
    pub fn frame_len(&self) -> usize {
        match self {
            Self::Health => 11,
            Self::Temperature => 15,
            Self::RawGyro | Self::RawAccel | Self::RawMag => 19,
            Self::Quaternion | Self::GyroBias => 19,
            Self::ProcGyro | Self::ProcAccel | Self::ProcMag => 23,
            Self::Position | Self::Velocity => 23,
            Self::Euler => 27,
            Self::Gps | Self::Satellites => 31,
            Self::Pose => 43,
            Self::AllRaw => 51,
            Self::AllProc => 55,
        }
    }

    /// Classify a frame by its shape.
    pub fn from_shape(address: u8, len: usize) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.address() == address && k.frame_len() == len)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::AllRaw => "all-raw",
            Self::RawGyro => "raw-gyro",
            Self::RawAccel => "raw-accel",
            Self::RawMag => "raw-mag",
            Self::Temperature => "temperature",
            Self::AllProc => "all-proc",
            Self::ProcGyro => "proc-gyro",
            Self::ProcAccel => "proc-accel",
            Self::ProcMag => "proc-mag",
            Self::Quaternion => "quaternion",
            Self::Euler => "euler",
            Self::Pose => "pose",
            Self::Position => "position",
            Self::Velocity => "velocity",
            Self::Gps => "gps",
            Self::Satellites => "satellites",
            Self::GyroBias => "gyro-bias",
        }
    }
}

impl core::fmt::Display for BroadcastKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl core::str::FromStr for BroadcastKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or(ProtocolError::InvalidArgument("unknown broadcast kind"))
    }
}

/// DREG_HEALTH, a packed status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Health {
    pub health: u32,
}

impl Health {
    fn bit(&self, n: u32) -> bool {
        self.health & (1 << n) != 0
    }

    /// Satellites used in the position solution.
    pub fn sats_used(&self) -> u8 {
        ((self.health >> 26) & 0x3f) as u8
    }

    /// Horizontal dilution of precision, raw.
    pub fn hdop(&self) -> u16 {
        ((self.health >> 16) & 0x3ff) as u16
    }

    pub fn sats_in_view(&self) -> u8 {
        ((self.health >> 10) & 0x3f) as u8
    }

    /// The sensor dropped broadcast data because the link was too slow.
    pub fn overflow(&self) -> bool {
        self.bit(8)
    }

    pub fn mag_norm_exceeded(&self) -> bool {
        self.bit(5)
    }

    pub fn accel_norm_exceeded(&self) -> bool {
        self.bit(4)
    }

    pub fn accel_failed(&self) -> bool {
        self.bit(3)
    }

    pub fn gyro_failed(&self) -> bool {
        self.bit(2)
    }

    pub fn mag_failed(&self) -> bool {
        self.bit(1)
    }

    pub fn gps_failed(&self) -> bool {
        self.bit(0)
    }
}

/// One raw sensor: three signed axes and a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RawVector {
    pub xyz: [i16; 3],
    pub time: f32,
}

/// One processed sensor: three axes in physical units and a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ProcVector {
    pub xyz: [f32; 3],
    pub time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct AllRaw {
    pub gyro: RawVector,
    pub accel: RawVector,
    pub mag: RawVector,
    /// Degrees Celsius.
    pub temperature: f32,
    pub temperature_time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct AllProc {
    /// Degrees per second.
    pub gyro: ProcVector,
    /// Gravities.
    pub accel: ProcVector,
    /// Unit norm.
    pub mag: ProcVector,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature {
    pub temperature: f32,
    pub time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Quaternion {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub time: f32,
}

/// Angles in degrees, rates in degrees per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Euler {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub roll_rate: f32,
    pub pitch_rate: f32,
    pub yaw_rate: f32,
    pub time: f32,
}

/// Meters from the home position.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Position {
    pub north: f32,
    pub east: f32,
    pub up: f32,
    pub time: f32,
}

/// Meters per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Velocity {
    pub north: f32,
    pub east: f32,
    pub up: f32,
    pub time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Pose {
    pub euler: Euler,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Gps {
    /// Degrees.
    pub latitude: f32,
    /// Degrees.
    pub longitude: f32,
    /// Meters.
    pub altitude: f32,
    /// Degrees.
    pub course: f32,
    /// Meters per second.
    pub speed: f32,
    pub time: f32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Satellite {
    pub id: u8,
    pub snr: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Satellites {
    pub satellites: [Satellite; 12],
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct GyroBias {
    pub xyz: [f32; 3],
}

/// A decoded broadcast packet.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum TelemetryPacket {
    Health(Health),
    AllRaw(AllRaw),
    RawGyro(RawVector),
    RawAccel(RawVector),
    RawMag(RawVector),
    Temperature(Temperature),
    AllProc(AllProc),
    ProcGyro(ProcVector),
    ProcAccel(ProcVector),
    ProcMag(ProcVector),
    Quaternion(Quaternion),
    Euler(Euler),
    Pose(Pose),
    Position(Position),
    Velocity(Velocity),
    Gps(Gps),
    Satellites(Satellites),
    GyroBias(GyroBias),
}

impl TelemetryPacket {
    pub fn kind(&self) -> BroadcastKind {
        match self {
            Self::Health(_) => BroadcastKind::Health,
            Self::AllRaw(_) => BroadcastKind::AllRaw,
            Self::RawGyro(_) => BroadcastKind::RawGyro,
            Self::RawAccel(_) => BroadcastKind::RawAccel,
            Self::RawMag(_) => BroadcastKind::RawMag,
            Self::Temperature(_) => BroadcastKind::Temperature,
            Self::AllProc(_) => BroadcastKind::AllProc,
            Self::ProcGyro(_) => BroadcastKind::ProcGyro,
            Self::ProcAccel(_) => BroadcastKind::ProcAccel,
            Self::ProcMag(_) => BroadcastKind::ProcMag,
            Self::Quaternion(_) => BroadcastKind::Quaternion,
            Self::Euler(_) => BroadcastKind::Euler,
            Self::Pose(_) => BroadcastKind::Pose,
            Self::Position(_) => BroadcastKind::Position,
            Self::Velocity(_) => BroadcastKind::Velocity,
            Self::Gps(_) => BroadcastKind::Gps,
            Self::Satellites(_) => BroadcastKind::Satellites,
            Self::GyroBias(_) => BroadcastKind::GyroBias,
        }
    }

    /// Decode a whole frame, checking its checksum and shape.
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let kind = BroadcastKind::from_shape(frame.address(), frame.len()).ok_or(
            ProtocolError::UnrecognizedFrame {
                address: frame.address(),
                len: frame.len(),
            },
        )?;
        let payload = extract_payload(frame)?;
        Self::decode_payload(kind, payload)
    }

    /// Decode a payload already known to be of the given kind.
    pub fn decode_payload(kind: BroadcastKind, payload: &[u8]) -> Result<Self, ProtocolError> {
        let parsed = match kind {
            BroadcastKind::Health => all(payload, health, Self::Health),
            BroadcastKind::AllRaw => all(payload, all_raw, Self::AllRaw),
            BroadcastKind::RawGyro => all(payload, raw_vector, Self::RawGyro),
            BroadcastKind::RawAccel => all(payload, raw_vector, Self::RawAccel),
            BroadcastKind::RawMag => all(payload, raw_vector, Self::RawMag),
            BroadcastKind::Temperature => all(payload, temperature, Self::Temperature),
            BroadcastKind::AllProc => all(payload, all_proc, Self::AllProc),
            BroadcastKind::ProcGyro => all(payload, proc_vector, Self::ProcGyro),
            BroadcastKind::ProcAccel => all(payload, proc_vector, Self::ProcAccel),
            BroadcastKind::ProcMag => all(payload, proc_vector, Self::ProcMag),
            BroadcastKind::Quaternion => all(payload, quaternion, Self::Quaternion),
            BroadcastKind::Euler => all(payload, euler, Self::Euler),
            BroadcastKind::Pose => all(payload, pose, Self::Pose),
            BroadcastKind::Position => all(payload, position, Self::Position),
            BroadcastKind::Velocity => all(payload, velocity, Self::Velocity),
            BroadcastKind::Gps => all(payload, gps, Self::Gps),
            BroadcastKind::Satellites => all(payload, satellites, Self::Satellites),
            BroadcastKind::GyroBias => all(payload, gyro_bias, Self::GyroBias),
        };

        parsed.ok_or(ProtocolError::Payload {
            address: kind.address(),
        })
    }
}

/// Run a parser over the entire payload.
fn all<'a, O, F, W>(payload: &'a [u8], parser: F, wrap: W) -> Option<TelemetryPacket>
where
    F: FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
    W: FnOnce(O) -> TelemetryPacket,
{
    nom::combinator::all_consuming(parser)(payload)
        .ok()
        .map(|(_, o)| wrap(o))
}

/// Parse a statically-sized array with a parser.
fn parse_array<'a, P, A, const SIZE: usize>(
    parser: P,
) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], [A; SIZE]>
where
    P: Fn(&'a [u8]) -> IResult<&'a [u8], A>,
    A: Default + Copy,
{
    move |input| {
        let mut data = [A::default(); SIZE];
        let (input, _) = nom::multi::fill(&parser, &mut data[..])(input)?;
        Ok((input, data))
    }
}

/// Two reserved bytes after three 16-bit values.
fn pad(input: &[u8]) -> IResult<&[u8], ()> {
    let (input, _) = take(2usize)(input)?;
    Ok((input, ()))
}

fn scaled(scale: f32) -> impl Fn(&[u8]) -> IResult<&[u8], f32> {
    move |input| {
        let (input, raw) = be_i16(input)?;
        Ok((input, raw as f32 / scale))
    }
}

fn health(input: &[u8]) -> IResult<&[u8], Health> {
    let (input, health) = be_u32(input)?;
    Ok((input, Health { health }))
}

fn raw_vector(input: &[u8]) -> IResult<&[u8], RawVector> {
    let (input, xyz) = parse_array(be_i16)(input)?;
    let (input, _) = pad(input)?;
    let (input, time) = be_f32(input)?;
    Ok((input, RawVector { xyz, time }))
}

fn proc_vector(input: &[u8]) -> IResult<&[u8], ProcVector> {
    let (input, xyz) = parse_array(be_f32)(input)?;
    let (input, time) = be_f32(input)?;
    Ok((input, ProcVector { xyz, time }))
}

fn temperature(input: &[u8]) -> IResult<&[u8], Temperature> {
    let (input, temperature) = be_f32(input)?;
    let (input, time) = be_f32(input)?;
    Ok((input, Temperature { temperature, time }))
}

fn all_raw(input: &[u8]) -> IResult<&[u8], AllRaw> {
    let (input, gyro) = raw_vector(input)?;
    let (input, accel) = raw_vector(input)?;
    let (input, mag) = raw_vector(input)?;
    let (input, temp) = temperature(input)?;
    Ok((
        input,
        AllRaw {
            gyro,
            accel,
            mag,
            temperature: temp.temperature,
            temperature_time: temp.time,
        },
    ))
}

fn all_proc(input: &[u8]) -> IResult<&[u8], AllProc> {
    let (input, gyro) = proc_vector(input)?;
    let (input, accel) = proc_vector(input)?;
    let (input, mag) = proc_vector(input)?;
    Ok((input, AllProc { gyro, accel, mag }))
}

fn quaternion(input: &[u8]) -> IResult<&[u8], Quaternion> {
    let (input, [a, b, c, d]) = parse_array(scaled(QUATERNION_SCALE))(input)?;
    let (input, time) = be_f32(input)?;
    Ok((input, Quaternion { a, b, c, d, time }))
}

fn euler(input: &[u8]) -> IResult<&[u8], Euler> {
    let (input, [roll, pitch, yaw]) = parse_array(scaled(EULER_SCALE))(input)?;
    let (input, _) = pad(input)?;
    let (input, [roll_rate, pitch_rate, yaw_rate]) = parse_array(scaled(EULER_SCALE))(input)?;
    let (input, _) = pad(input)?;
    let (input, time) = be_f32(input)?;
    Ok((
        input,
        Euler {
            roll,
            pitch,
            yaw,
            roll_rate,
            pitch_rate,
            yaw_rate,
            time,
        },
    ))
}

fn position(input: &[u8]) -> IResult<&[u8], Position> {
    let (input, [north, east, up, time]) = parse_array(be_f32)(input)?;
    Ok((
        input,
        Position {
            north,
            east,
            up,
            time,
        },
    ))
}

fn velocity(input: &[u8]) -> IResult<&[u8], Velocity> {
    let (input, [north, east, up, time]) = parse_array(be_f32)(input)?;
    Ok((
        input,
        Velocity {
            north,
            east,
            up,
            time,
        },
    ))
}

fn pose(input: &[u8]) -> IResult<&[u8], Pose> {
    let (input, euler) = euler(input)?;
    let (input, position) = position(input)?;
    Ok((input, Pose { euler, position }))
}

fn gps(input: &[u8]) -> IResult<&[u8], Gps> {
    let (input, [latitude, longitude, altitude, course, speed, time]) =
        parse_array(be_f32)(input)?;
    Ok((
        input,
        Gps {
            latitude,
            longitude,
            altitude,
            course,
            speed,
            time,
        },
    ))
}

fn satellite(input: &[u8]) -> IResult<&[u8], Satellite> {
    let (input, id) = be_u8(input)?;
    let (input, snr) = be_u8(input)?;
    Ok((input, Satellite { id, snr }))
}

fn satellites(input: &[u8]) -> IResult<&[u8], Satellites> {
    let (input, satellites) = parse_array(satellite)(input)?;
    Ok((input, Satellites { satellites }))
}

fn gyro_bias(input: &[u8]) -> IResult<&[u8], GyroBias> {
    let (input, xyz) = parse_array(be_f32)(input)?;
    Ok((input, GyroBias { xyz }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::build_request_frame;
    use crate::protocol::serialize::{Serializer, SerializerVec};

    fn batch(address: u8, payload: &[u8]) -> Vec<u8> {
        let n = (payload.len() / 4) as u8;
        let type_byte = if n == 1 { 0x80 } else { 0xc0 | (n << 2) };
        build_request_frame(type_byte, address, payload)
    }

    fn decode(data: &[u8]) -> Result<TelemetryPacket, ProtocolError> {
        TelemetryPacket::decode(&Frame::new(data))
    }

    #[test]
    fn shapes_are_unique() {
        for a in BroadcastKind::ALL {
            assert_eq!(BroadcastKind::from_shape(a.address(), a.frame_len()), Some(a));
            assert_eq!(a.frame_len() % 4, 3);
        }
    }

    #[test]
    fn kind_names() {
        for a in BroadcastKind::ALL {
            assert_eq!(a.name().parse::<BroadcastKind>(), Ok(a));
        }
        assert!("nope".parse::<BroadcastKind>().is_err());
    }

    #[test]
    fn decode_health() {
        let data = batch(0x55, &[0x08, 0x0a, 0x14, 0x25]);
        let Ok(TelemetryPacket::Health(h)) = decode(&data) else {
            panic!("not health");
        };
        assert_eq!(h.health, 0x080a1425);
        assert_eq!(h.sats_used(), 2);
        assert_eq!(h.hdop(), 0x00a);
        assert_eq!(h.sats_in_view(), 5);
        assert!(!h.overflow());
        assert!(h.mag_norm_exceeded());
        assert!(h.gyro_failed());
        assert!(h.gps_failed());
        assert!(!h.accel_failed());
    }

    #[test]
    fn decode_euler() {
        let mut ser = SerializerVec::new();
        for raw in [9102i16, -4551, 0] {
            ser.write_be_i16(raw).unwrap();
        }
        ser.write_bytes(&[0, 0]).unwrap();
        for raw in [91i16, 0, -182] {
            ser.write_be_i16(raw).unwrap();
        }
        ser.write_bytes(&[0, 0]).unwrap();
        ser.write_be_f32(12.5).unwrap();
        let data = batch(0x70, &ser.done());
        assert_eq!(data.len(), 27);

        let Ok(TelemetryPacket::Euler(e)) = decode(&data) else {
            panic!("not euler");
        };
        assert!((e.roll - 100.0).abs() < 0.01);
        assert!((e.pitch + 50.0).abs() < 0.01);
        assert_eq!(e.yaw, 0.0);
        assert!((e.roll_rate - 1.0).abs() < 0.01);
        assert!((e.yaw_rate + 2.0).abs() < 0.01);
        assert_eq!(e.time, 12.5);
    }

    #[test]
    fn decode_quaternion() {
        let mut ser = SerializerVec::new();
        for raw in [29789i16, 0, -14895, 0] {
            ser.write_be_i16(raw).unwrap();
        }
        ser.write_be_f32(3.0).unwrap();
        let data = batch(0x6d, &ser.done());

        let Ok(TelemetryPacket::Quaternion(q)) = decode(&data) else {
            panic!("not quaternion");
        };
        assert!((q.a - 1.0).abs() < 0.001);
        assert!((q.c + 0.5).abs() < 0.001);
        assert_eq!(q.time, 3.0);
    }

    #[test]
    fn decode_all_raw() {
        let mut ser = SerializerVec::new();
        for sensor in 0..3i16 {
            for axis in 0..3i16 {
                ser.write_be_i16(sensor * 10 + axis).unwrap();
            }
            ser.write_bytes(&[0, 0]).unwrap();
            ser.write_be_f32(sensor as f32).unwrap();
        }
        ser.write_be_f32(21.5).unwrap();
        ser.write_be_f32(4.0).unwrap();
        let data = batch(0x56, &ser.done());
        assert_eq!(data.len(), 51);

        let Ok(TelemetryPacket::AllRaw(r)) = decode(&data) else {
            panic!("not all raw");
        };
        assert_eq!(r.gyro.xyz, [0, 1, 2]);
        assert_eq!(r.accel.xyz, [10, 11, 12]);
        assert_eq!(r.mag.xyz, [20, 21, 22]);
        assert_eq!(r.mag.time, 2.0);
        assert_eq!(r.temperature, 21.5);
        assert_eq!(r.temperature_time, 4.0);
    }

    #[test]
    fn decode_proc_gyro_not_all_proc() {
        let mut ser = SerializerVec::new();
        for v in [1.0f32, 2.0, 3.0, 0.5] {
            ser.write_be_f32(v).unwrap();
        }
        let data = batch(0x61, &ser.done());
        assert_eq!(
            decode(&data),
            Ok(TelemetryPacket::ProcGyro(ProcVector {
                xyz: [1.0, 2.0, 3.0],
                time: 0.5,
            }))
        );
    }

    #[test]
    fn decode_satellites() {
        let payload: Vec<u8> = (0..24).collect();
        let data = batch(0x83, &payload);
        let Ok(TelemetryPacket::Satellites(s)) = decode(&data) else {
            panic!("not satellites");
        };
        assert_eq!(s.satellites[0], Satellite { id: 0, snr: 1 });
        assert_eq!(s.satellites[11], Satellite { id: 22, snr: 23 });
    }

    #[test]
    fn decode_unrecognized() {
        let data = batch(0x55, &[0; 8]);
        assert_eq!(
            decode(&data),
            Err(ProtocolError::UnrecognizedFrame {
                address: 0x55,
                len: 15
            })
        );
    }

    #[test]
    fn decode_bad_checksum() {
        let mut data = batch(0x55, &[0; 4]);
        data[10] ^= 1;
        assert!(matches!(decode(&data), Err(ProtocolError::Checksum { .. })));
    }
}
