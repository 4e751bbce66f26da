pub mod collected_information;

#[cfg(test)]
pub(crate) mod test_utils;
