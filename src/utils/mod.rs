mod read_ext;

pub(crate) use self::read_ext::ReadExt;
