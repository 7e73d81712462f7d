//! PMBus command names, STATUS_WORD bit semantics and the register
//! transport boundary.

use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

pub const STATUS_WORD: &str = "status0";
pub const STATUS_VOUT: &str = "status0_vout";
pub const STATUS_IOUT: &str = "status0_iout";
pub const STATUS_INPUT: &str = "status0_input";
pub const STATUS_TEMPERATURE: &str = "status0_temp";
pub const STATUS_CML: &str = "status0_cml";
pub const STATUS_MFR: &str = "status0_mfr";
pub const STATUS_FANS_1_2: &str = "status0_fan12";
pub const ON_OFF_CONFIG: &str = "on_off_config";
pub const VOUT_COMMAND: &str = "vout_command";
pub const READ_VIN: &str = "in1_input";
pub const READ_VOUT: &str = "in2_input";
pub const READ_IOUT: &str = "curr1_input";
pub const READ_TEMPERATURE_1: &str = "temp1_input";

/// ON_OFF_CONFIG: respond to the CONTROL pin only, ignore OPERATION.
pub const ON_OFF_CONFIG_CONTROL_PIN_ONLY: u8 = 0x18;

/// Secondary status registers captured alongside a STATUS_WORD fault.
pub const SECONDARY_STATUS: [&str; 7] = [
    STATUS_INPUT,
    STATUS_MFR,
    STATUS_CML,
    STATUS_VOUT,
    STATUS_IOUT,
    STATUS_FANS_1_2,
    STATUS_TEMPERATURE,
];

/// STATUS_VOUT register name for a given PMBus page.
pub fn status_vout_page(page: u8) -> String {
    format!("status{}_vout", page)
}

/// Register value encoding, chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Linear11,
    Byte,
    Word,
}

/// Read/write access to one device's registers.
///
/// Implemented by the physical transport (I2C, hwmon sysfs) or by
/// [`crate::sim`]. Methods take `&self`; the monitoring path only ever holds
/// shared references to the device tree.
pub trait RegisterAccess {
    fn read(&self, command: &str, encoding: Encoding) -> Result<u16, TransportError>;
    fn write(&self, command: &str, encoding: Encoding, value: u16) -> Result<(), TransportError>;
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for Box<T> {
    fn read(&self, command: &str, encoding: Encoding) -> Result<u16, TransportError> {
        (**self).read(command, encoding)
    }

    fn write(&self, command: &str, encoding: Encoding, value: u16) -> Result<(), TransportError> {
        (**self).write(command, encoding, value)
    }
}

pub mod status_word {
    pub const CML_FAULT: u16 = 0x0002;
    pub const TEMPERATURE_FAULT_WARN: u16 = 0x0004;
    pub const VIN_UV_FAULT: u16 = 0x0008;
    pub const IOUT_OC_FAULT: u16 = 0x0010;
    pub const VOUT_OV_FAULT: u16 = 0x0020;
    pub const UNIT_IS_OFF: u16 = 0x0040;
    pub const FAN_FAULT: u16 = 0x0400;
    pub const POWER_GOOD_NEGATED: u16 = 0x0800;
    pub const MFR_SPECIFIC_FAULT: u16 = 0x1000;
    pub const INPUT_FAULT_WARN: u16 = 0x2000;
    pub const IOUT_POUT_FAULT: u16 = 0x4000;
    pub const VOUT_FAULT: u16 = 0x8000;
}

const STATUS_WORD_BITS: [u16; 12] = [
    status_word::CML_FAULT,
    status_word::TEMPERATURE_FAULT_WARN,
    status_word::VIN_UV_FAULT,
    status_word::IOUT_OC_FAULT,
    status_word::VOUT_OV_FAULT,
    status_word::UNIT_IS_OFF,
    status_word::FAN_FAULT,
    status_word::POWER_GOOD_NEGATED,
    status_word::MFR_SPECIFIC_FAULT,
    status_word::INPUT_FAULT_WARN,
    status_word::IOUT_POUT_FAULT,
    status_word::VOUT_FAULT,
];

const fn combined_bits(bits: &[u16]) -> u16 {
    let mut combined = 0;
    let mut i = 0;
    while i < bits.len() {
        combined |= bits[i];
        i += 1;
    }
    combined
}

// one distinct bit per flag
const_assert_eq!(combined_bits(&STATUS_WORD_BITS).count_ones(), 12);

/// Decoded STATUS_WORD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusWord(pub u16);

impl StatusWord {
    fn has(self, mask: u16) -> bool {
        self.0 & mask != 0
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    /// The STATUS_BYTE half of the word.
    pub fn low_byte(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    pub fn high_byte(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn is_clear(self) -> bool {
        self.0 == 0
    }

    pub fn cml_fault(self) -> bool {
        self.has(status_word::CML_FAULT)
    }

    pub fn temperature_fault(self) -> bool {
        self.has(status_word::TEMPERATURE_FAULT_WARN)
    }

    pub fn vin_uv_fault(self) -> bool {
        self.has(status_word::VIN_UV_FAULT)
    }

    pub fn iout_oc_fault(self) -> bool {
        self.has(status_word::IOUT_OC_FAULT)
    }

    pub fn vout_ov_fault(self) -> bool {
        self.has(status_word::VOUT_OV_FAULT)
    }

    pub fn unit_is_off(self) -> bool {
        self.has(status_word::UNIT_IS_OFF)
    }

    pub fn fan_fault(self) -> bool {
        self.has(status_word::FAN_FAULT)
    }

    pub fn power_good_negated(self) -> bool {
        self.has(status_word::POWER_GOOD_NEGATED)
    }

    /// PGOOD# deasserted or the unit reports itself off.
    pub fn pgood_or_unit_off(self) -> bool {
        self.power_good_negated() || self.unit_is_off()
    }

    pub fn mfr_fault(self) -> bool {
        self.has(status_word::MFR_SPECIFIC_FAULT)
    }

    pub fn input_fault(self) -> bool {
        self.has(status_word::INPUT_FAULT_WARN)
    }

    pub fn vout_fault(self) -> bool {
        self.has(status_word::VOUT_FAULT)
    }
}

/// Decode a linear-11 value: 5-bit two's complement exponent in the top bits,
/// 11-bit two's complement mantissa below.
pub fn linear11_to_f64(raw: u16) -> f64 {
    let exponent = ((raw as i16) >> 11) as i32;
    let mantissa = (((raw & 0x07FF) << 5) as i16 >> 5) as i32;
    f64::from(mantissa) * 2f64.powi(exponent)
}

/// Encode a value as linear-11, picking the smallest exponent that keeps the
/// mantissa in range. Values beyond the representable range saturate.
pub fn f64_to_linear11(value: f64) -> u16 {
    for exponent in -16i32..=15 {
        let mantissa = (value / 2f64.powi(exponent)).round();
        if (-1024.0..=1023.0).contains(&mantissa) {
            let exponent_bits = ((exponent as i16 as u16) & 0x1F) << 11;
            let mantissa_bits = (mantissa as i16 as u16) & 0x07FF;
            return exponent_bits | mantissa_bits;
        }
    }
    let mantissa: i16 = if value < 0.0 { -1024 } else { 1023 };
    (15u16 << 11) | (mantissa as u16 & 0x07FF)
}
