//! Memory bus interface.

/// Memory bus interface.
///
/// CPUs access memory and peripherals through this trait. The bus handles
/// address decoding and routing to the appropriate device. Reads may have
/// side effects (hardware registers), so the bus is taken mutably.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Read a big-endian word from the given address.
    fn read_word(&mut self, address: u16) -> u16 {
        let high = self.read(address);
        let low = self.read(address.wrapping_add(1));
        u16::from(high) << 8 | u16::from(low)
    }
}

/// Flat 64 KiB memory with no decoding. Test and bring-up helper.
#[derive(Clone)]
pub struct SimpleBus {
    pub memory: Vec<u8>,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: vec![0; 0x1_0000],
        }
    }

    /// Copy `data` into memory starting at `address`.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let start = usize::from(address);
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.memory[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[usize::from(address)] = value;
    }
}
