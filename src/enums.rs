use packed_struct::prelude::*;

#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, Eq, PartialEq)]
/// Response code, things like NOERROR, FORMATERROR, SERVFAIL etc.
pub enum Rcode {
    /// No error condition
    NoError = 0,
    /// Format error - the name server was unable to interpret the query.
    FormatError = 1,
    /// Server failure - the name server was unable to process this query due to a problem with the name server.
    ServFail = 2,
    /// Name Error - meaningful only for authoritative responses.
    NameError = 3,
    /// Not Implemented - the name server does not support the requested kind of query.
    NotImplemented = 4,
    /// Refused - the name server refuses to perform the specified operation for policy reasons.
    Refused = 5,
    // 6..15 - Reserved for future use
}

impl TryFrom<u8> for Rcode {
    type Error = u8;

    /// Only the configured refusal rcode and NoError are ever constructed by this
    /// forwarder, but startup validates any rcode in [1,5] that a config file supplies.
    fn try_from(input: u8) -> Result<Self, u8> {
        match input {
            0 => Ok(Self::NoError),
            1 => Ok(Self::FormatError),
            2 => Ok(Self::ServFail),
            3 => Ok(Self::NameError),
            4 => Ok(Self::NotImplemented),
            5 => Ok(Self::Refused),
            other => Err(other),
        }
    }
}
