mod spin;

pub(crate) use spin::SpinMutex;
