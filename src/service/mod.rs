// service
// > outbound clients of the recorder
pub mod status;
