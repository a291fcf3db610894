use crate::instr::{DataType, Instruction, Opcode};
use crate::mapping::Mapping;
use crate::site::{Host, Project, SiteRef};

/**
 * A mapper knows how to realize some fixed set of opcodes on one class of
 * functional unit. It can either reuse an existing site, or allocate a new
 * one. A refusal (empty result, or 'None') is a normal outcome, and the caller
 * is expected to try the other mappers.
 *
 * Mappers must never map an opcode that they do not declare in
 * 'supported_instructions()'.
 */
pub trait Mapper {
    fn name(&self) -> &'static str;

    fn supported_instructions(&self) -> &[Opcode];

    fn supports(&self, opcode: Opcode) -> bool {
        self.supported_instructions().contains(&opcode)
    }

    /// Candidate mappings that reuse the given site.
    fn try_map(
        &self,
        site: &SiteRef,
        instr: &Instruction,
        operand_types: &[DataType],
        result_types: &[DataType],
    ) -> Vec<Mapping>;

    /// Creates a new site within 'host', and maps the instruction onto it.
    fn try_allocate(
        &self,
        host: &mut Host,
        instr: &Instruction,
        operand_types: &[DataType],
        result_types: &[DataType],
        project: &mut Project,
    ) -> Option<Mapping>;
}
