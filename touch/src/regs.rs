//! Register maps for the RA8875 touch block and the FT5206 capacitive controller.

/// RA8875 registers used by the resistive touch panel
pub mod ra8875 {
    /// Touch panel control 0: enable, ADC sample time, ADC clock
    pub const TPCR0: u8 = 0x70;
    /// Touch panel control 1: mode, debounce, manual mode
    pub const TPCR1: u8 = 0x71;
    /// X sample bits [9:2]
    pub const TPXH: u8 = 0x72;
    /// Y sample bits [9:2]
    pub const TPYH: u8 = 0x73;
    /// X bits [1:0] in [1:0], Y bits [1:0] in [3:2]
    pub const TPXYL: u8 = 0x74;
    /// Interrupt enable
    pub const INTC1: u8 = 0xF0;
    /// Interrupt flags, write 1 to clear
    pub const INTC2: u8 = 0xF1;

    pub const INT_TP: u8 = 1 << 2;

    pub const TP_ENABLE: u8 = 1 << 7;

    /// Status register bit set while memory writes are pending
    pub const STATUS_BUSY: u8 = 0x80;

    /// Serial interface prefixes
    pub const CMD_WRITE: u8 = 0x80;
    pub const STATUS_READ: u8 = 0xC0;
    pub const DATA_WRITE: u8 = 0x00;
    pub const DATA_READ: u8 = 0x40;
}

/// FT5206 capacitive controller registers
pub mod ft5206 {
    pub const I2C_ADDRESS: u8 = 0x38;

    pub const DEVICE_MODE: u8 = 0x00;
    pub const GEST_ID: u8 = 0x01;
    pub const TD_STATUS: u8 = 0x02;
    /// First register of the touch 1 block. Blocks are 6 registers apart.
    pub const TOUCH1_XH: u8 = 0x03;
    pub const TOUCH_BLOCK_STRIDE: usize = 6;

    /// Registers 0x00..=0x1E cover mode, gesture, status and all five touch blocks
    pub const NUMBER_OF_REGISTERS: usize = 31;

    pub const GEST_ID_MOVE_UP: u8 = 0x10;
    pub const GEST_ID_MOVE_LEFT: u8 = 0x14;
    pub const GEST_ID_MOVE_DOWN: u8 = 0x18;
    pub const GEST_ID_MOVE_RIGHT: u8 = 0x1C;
    pub const GEST_ID_ZOOM_IN: u8 = 0x48;
    pub const GEST_ID_ZOOM_OUT: u8 = 0x49;
    pub const GEST_ID_NO_GESTURE: u8 = 0x00;

    pub const EVENT_FLAG_PUT_DOWN: u8 = 0x00;
    pub const EVENT_FLAG_PUT_UP: u8 = 0x01;
    pub const EVENT_FLAG_CONTACT: u8 = 0x02;
}
