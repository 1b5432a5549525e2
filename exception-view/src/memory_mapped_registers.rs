/// A memory mapped register, for instance the NVIC fault status registers (HFSR, CFSR, etc).
pub trait MemoryMappedRegister: Clone + From<u32> + Into<u32> + Sized + std::fmt::Debug {
    /// The register's address in the target memory.
    const ADDRESS: u32;
    /// The register's name.
    const NAME: &'static str;

    /// The register's address in the target memory.
    fn get_mmio_address() -> u32 {
        Self::ADDRESS
    }
}

/// Declares a [`bitfield`](::bitfield::bitfield) backed register at a fixed address
/// and implements [`MemoryMappedRegister`] for it.
///
/// ```
/// use exception_view::{memory_mapped_bitfield_register, MemoryMappedRegister};
///
/// memory_mapped_bitfield_register! {
///     /// VTOR - Vector Table Offset Register
///     pub struct Vtor(u32);
///     0xE000_ED08, "VTOR",
///     impl From;
///     pub table_offset, _: 31, 7;
/// }
///
/// assert_eq!(Vtor::ADDRESS, 0xE000_ED08);
/// assert_eq!(Vtor::from(0x0000_0280).table_offset(), 5);
/// ```
#[macro_export]
macro_rules! memory_mapped_bitfield_register {
    (
        $(#[$outer:meta])*
        pub struct $reg:ident($type:tt);
        $addr:expr, $name:expr,
        impl From;
        $($fields:tt)*
    ) => {
        $crate::bitfield::bitfield! {
            $(#[$outer])*
            #[derive(Copy, Clone)]
            pub struct $reg($type);
            impl Debug;
            $($fields)*
        }

        impl From<$type> for $reg {
            fn from(value: $type) -> Self {
                Self(value)
            }
        }

        impl From<$reg> for $type {
            fn from(register: $reg) -> Self {
                register.0
            }
        }

        impl $crate::MemoryMappedRegister for $reg {
            const ADDRESS: u32 = $addr;
            const NAME: &'static str = $name;
        }
    };
}
